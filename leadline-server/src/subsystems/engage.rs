//! Engagement — CTA augmentation, fallback reply, quick-reply suggestions
//!
//! Decides whether the model's reply gets a canned call-to-action appended,
//! and which one. This is a four-branch conditional in a fixed priority
//! order (urgency, budget, enterprise), not a rules engine. The CTA is
//! suppressed when the model already pitched a consultation or printed the
//! consultant's phone number.

use super::scoring::{self, ProjectComplexity};
use super::signals::SignalSet;

// ============================================================================
// Constants
// ============================================================================

/// Per-turn score at which a CTA (and the consultation offer flag) triggers.
pub const CTA_SCORE_THRESHOLD: i32 = 50;

/// The consultant's direct line, shown in every CTA and in the fallback.
pub const CONTACT_PHONE: &str = "+212 6 61 23 45 67";

const URGENCY_CTA: &str = "\n\n⚡ Votre projet semble urgent : je peux vous proposer \
un créneau dès cette semaine. Appelez-moi au +212 6 61 23 45 67 pour une \
consultation gratuite de 30 minutes.";

const BUDGET_CTA: &str = "\n\n💼 Vous avez déjà une enveloppe en tête — profitons-en \
pour cadrer votre projet ensemble. Réservez une consultation gratuite au \
+212 6 61 23 45 67.";

const ENTERPRISE_CTA: &str = "\n\n🏢 Pour un projet de cette envergure, je recommande \
un audit technique personnalisé. Contactez-moi au +212 6 61 23 45 67 pour en discuter.";

const FALLBACK_REPLY: &str = "Désolé, je rencontre un souci technique de mon côté. \
Vous pouvez me joindre directement au +212 6 61 23 45 67, ou réessayer dans un instant.";

// ============================================================================
// Reply augmentation
// ============================================================================

/// Append a CTA suffix when the turn qualifies and the model has not
/// already made the pitch itself. Priority: urgency, then budget, then
/// enterprise complexity; otherwise the reply is returned unchanged.
pub fn augment_reply(
    reply: &str,
    turn_score: i32,
    signals: &SignalSet,
    complexity: ProjectComplexity,
) -> String {
    if turn_score < CTA_SCORE_THRESHOLD {
        return reply.to_string();
    }

    // The model sometimes closes the loop on its own; never double-pitch.
    if reply.to_lowercase().contains("consultation") || reply.contains("+212") {
        return reply.to_string();
    }

    if signals.urgency_signals {
        format!("{}{}", reply, URGENCY_CTA)
    } else if signals.budget_mentioned {
        format!("{}{}", reply, BUDGET_CTA)
    } else if complexity == ProjectComplexity::Enterprise {
        format!("{}{}", reply, ENTERPRISE_CTA)
    } else {
        reply.to_string()
    }
}

/// The generic always-respond-usefully text used for every error path.
pub fn fallback_reply() -> &'static str {
    FALLBACK_REPLY
}

// ============================================================================
// Engagement flags and suggestions
// ============================================================================

/// Ask for an email once the conversation is worth a lead but has no
/// contact address yet.
pub fn should_collect_email(email_known: bool, running_score: i32) -> bool {
    !email_known && running_score >= scoring::LEAD_MIN_SCORE
}

pub fn should_offer_consultation(turn_score: i32) -> bool {
    turn_score >= CTA_SCORE_THRESHOLD
}

/// Up to three canned quick-replies, chosen by what the visitor has not
/// told us yet.
pub fn suggestions(signals: &SignalSet, complexity: ProjectComplexity) -> Vec<String> {
    let mut out = Vec::new();

    if !signals.project_mentioned {
        out.push("Décrivez-moi votre projet en quelques mots".to_string());
    }
    if !signals.budget_mentioned {
        out.push("Quel est votre budget approximatif ?".to_string());
    }
    if signals.emails.is_empty() {
        out.push("Laissez votre email pour recevoir un devis".to_string());
    }
    if complexity == ProjectComplexity::Enterprise && out.len() < 3 {
        out.push("Planifier un audit technique".to_string());
    }

    out.truncate(3);
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn urgency_signals() -> SignalSet {
        SignalSet {
            urgency_signals: true,
            ..Default::default()
        }
    }

    // ========================================================================
    // TEST 1: below the threshold the reply is untouched
    // ========================================================================
    #[test]
    fn test_no_cta_below_threshold() {
        let out = augment_reply("Bonne question !", 49, &urgency_signals(), ProjectComplexity::Unknown);
        assert_eq!(out, "Bonne question !");
    }

    // ========================================================================
    // TEST 2: a reply already containing "+212" never gets a CTA
    // ========================================================================
    #[test]
    fn test_no_cta_when_phone_already_present() {
        let reply = "Appelez-nous au +212 6 61 23 45 67 !";
        let out = augment_reply(reply, 150, &urgency_signals(), ProjectComplexity::Enterprise);
        assert_eq!(out, reply);
    }

    // ========================================================================
    // TEST 3: "consultation" in the model reply suppresses the CTA,
    // case-insensitively
    // ========================================================================
    #[test]
    fn test_no_cta_when_consultation_mentioned() {
        let reply = "Je vous propose une Consultation gratuite.";
        let out = augment_reply(reply, 90, &urgency_signals(), ProjectComplexity::Unknown);
        assert_eq!(out, reply);
    }

    // ========================================================================
    // TEST 4: urgency outranks budget outranks enterprise
    // ========================================================================
    #[test]
    fn test_cta_priority_order() {
        let both = SignalSet {
            urgency_signals: true,
            budget_mentioned: true,
            ..Default::default()
        };
        let out = augment_reply("Voici ma réponse.", 80, &both, ProjectComplexity::Enterprise);
        assert!(out.contains("urgent"), "urgency CTA must win: {}", out);

        let budget_only = SignalSet {
            budget_mentioned: true,
            ..Default::default()
        };
        let out = augment_reply("Voici ma réponse.", 80, &budget_only, ProjectComplexity::Enterprise);
        assert!(out.contains("enveloppe"), "budget CTA must win over enterprise: {}", out);

        let neither = SignalSet::default();
        let out = augment_reply("Voici ma réponse.", 80, &neither, ProjectComplexity::Enterprise);
        assert!(out.contains("audit technique"), "enterprise CTA expected: {}", out);
    }

    // ========================================================================
    // TEST 5: no eligible trigger appends nothing even above the threshold
    // ========================================================================
    #[test]
    fn test_no_trigger_no_suffix() {
        let out = augment_reply("Voici ma réponse.", 80, &SignalSet::default(), ProjectComplexity::Medium);
        assert_eq!(out, "Voici ma réponse.");
    }

    // ========================================================================
    // TEST 6: every CTA and the fallback carry the consultant's number
    // ========================================================================
    #[test]
    fn test_ctas_and_fallback_contain_phone() {
        assert!(URGENCY_CTA.contains(CONTACT_PHONE));
        assert!(BUDGET_CTA.contains(CONTACT_PHONE));
        assert!(ENTERPRISE_CTA.contains(CONTACT_PHONE));
        assert!(fallback_reply().contains(CONTACT_PHONE));
    }

    // ========================================================================
    // TEST 7: email collection flag
    // ========================================================================
    #[test]
    fn test_should_collect_email() {
        assert!(should_collect_email(false, 30));
        assert!(!should_collect_email(false, 29));
        assert!(!should_collect_email(true, 100));
    }

    // ========================================================================
    // TEST 8: suggestions track missing information, capped at three
    // ========================================================================
    #[test]
    fn test_suggestions_for_blank_conversation() {
        let s = suggestions(&SignalSet::default(), ProjectComplexity::Enterprise);
        assert_eq!(s.len(), 3);
        assert!(s[0].contains("projet"));
    }

    #[test]
    fn test_suggestions_empty_when_everything_known() {
        let full = SignalSet {
            project_mentioned: true,
            budget_mentioned: true,
            emails: vec!["a@b.com".to_string()],
            ..Default::default()
        };
        let s = suggestions(&full, ProjectComplexity::Medium);
        assert!(s.is_empty());
    }
}
