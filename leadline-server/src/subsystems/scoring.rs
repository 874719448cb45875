//! Lead scoring — weighted signal sum, status buckets, complexity cascade
//!
//! The per-turn score is a plain sum of fixed weights over the extracted
//! signal set plus a small bonus for long conversations. There is no upper
//! clamp: a turn that fires everything scores 200, and the status
//! thresholds read that raw value. The stored conversation score is merged
//! elsewhere as a running maximum; this module is pure.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::signals::SignalSet;

// ============================================================================
// Weights and thresholds
// ============================================================================

pub const WEIGHT_BUDGET: i32 = 25;
pub const WEIGHT_PROJECT: i32 = 20;
pub const WEIGHT_URGENCY: i32 = 15;
pub const WEIGHT_COMPANY: i32 = 20;
pub const WEIGHT_DECISION_MAKER: i32 = 30;
pub const WEIGHT_TECHNICAL: i32 = 15;
pub const WEIGHT_EMAIL: i32 = 25;
pub const WEIGHT_PHONE: i32 = 20;
pub const WEIGHT_LONG_HISTORY: i32 = 10;

/// History bonus applies strictly above this many prior turns.
pub const LONG_HISTORY_TURNS: usize = 5;

pub const HOT_THRESHOLD: i32 = 70;
pub const WARM_THRESHOLD: i32 = 40;

/// Minimum running score before an extracted email becomes a lead row.
pub const LEAD_MIN_SCORE: i32 = 30;

/// Running score at which a new lead is created as "qualified" not "new".
pub const QUALIFIED_SCORE: i32 = 70;

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Cold,
    Warm,
    Hot,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Cold => "cold",
            LeadStatus::Warm => "warm",
            LeadStatus::Hot => "hot",
        }
    }
}

/// Bucket a per-turn score. Evaluated on the raw turn score, before the
/// running-maximum merge into the conversation record.
pub fn status_for(score: i32) -> LeadStatus {
    if score >= HOT_THRESHOLD {
        LeadStatus::Hot
    } else if score >= WARM_THRESHOLD {
        LeadStatus::Warm
    } else {
        LeadStatus::Cold
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Sum the fixed weights for every signal present in this turn.
/// `history_len` is the number of prior turns accepted for this request.
pub fn score_turn(signals: &SignalSet, history_len: usize) -> i32 {
    let mut score = 0;

    if signals.budget_mentioned {
        score += WEIGHT_BUDGET;
    }
    if signals.project_mentioned {
        score += WEIGHT_PROJECT;
    }
    if signals.urgency_signals {
        score += WEIGHT_URGENCY;
    }
    if signals.company_context {
        score += WEIGHT_COMPANY;
    }
    if signals.decision_maker {
        score += WEIGHT_DECISION_MAKER;
    }
    if signals.technical_needs {
        score += WEIGHT_TECHNICAL;
    }
    if !signals.emails.is_empty() {
        score += WEIGHT_EMAIL;
    }
    if !signals.phones.is_empty() {
        score += WEIGHT_PHONE;
    }
    if history_len > LONG_HISTORY_TURNS {
        score += WEIGHT_LONG_HISTORY;
    }

    score
}

// ============================================================================
// Project complexity — independent first-match-wins cascade
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectComplexity {
    Simple,
    Medium,
    Complex,
    Enterprise,
    Unknown,
}

impl ProjectComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectComplexity::Simple => "simple",
            ProjectComplexity::Medium => "medium",
            ProjectComplexity::Complex => "complex",
            ProjectComplexity::Enterprise => "enterprise",
            ProjectComplexity::Unknown => "unknown",
        }
    }
}

// Ordered (label, patterns) pairs. Checked top to bottom, first match wins;
// "enterprise" keywords shadow everything below them.
const COMPLEXITY_CASCADE: &[(ProjectComplexity, &[&str])] = &[
    (
        ProjectComplexity::Enterprise,
        &[
            r"erp\b",
            r"multinational",
            r"grande entreprise",
            r"grand groupe",
            r"filiale",
            r"intranet",
            r"migration de syst[eè]me",
            r"enterprise",
        ],
    ),
    (
        ProjectComplexity::Complex,
        &[
            r"marketplace",
            r"plateforme",
            r"platform",
            r"\bia\b",
            r"intelligence artificielle",
            r"machine learning",
            r"espace client",
            r"multi[- ]?vendeur",
            r"temps r[eé]el",
        ],
    ),
    (
        ProjectComplexity::Medium,
        &[
            r"e-?commerce",
            r"boutique en ligne",
            r"application mobile",
            r"app mobile",
            r"r[eé]servation",
            r"paiement en ligne",
            r"\bcrm\b",
        ],
    ),
    (
        ProjectComplexity::Simple,
        &[
            r"site vitrine",
            r"landing",
            r"one[- ]?page",
            r"portfolio",
            r"\bblog\b",
            r"page de vente",
        ],
    ),
];

/// Classify the message into a complexity tier. Returns `Unknown` when no
/// tier matches; callers preserve the previously stored value in that case.
pub fn classify_complexity(message: &str) -> ProjectComplexity {
    let lower = message.to_lowercase();

    for (label, patterns) in COMPLEXITY_CASCADE {
        for pattern in *patterns {
            if let Ok(re) = Regex::new(pattern) {
                if re.is_match(&lower) {
                    return *label;
                }
            }
        }
    }

    ProjectComplexity::Unknown
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn all_signals() -> SignalSet {
        SignalSet {
            budget_mentioned: true,
            project_mentioned: true,
            urgency_signals: true,
            company_context: true,
            decision_maker: true,
            technical_needs: true,
            emails: vec!["a@b.com".to_string()],
            phones: vec!["+212612345678".to_string()],
        }
    }

    // ========================================================================
    // TEST 1: empty signal set scores zero and buckets cold
    // ========================================================================
    #[test]
    fn test_no_signals_scores_zero_cold() {
        let score = score_turn(&SignalSet::default(), 0);
        assert_eq!(score, 0);
        assert_eq!(status_for(score), LeadStatus::Cold);
    }

    // ========================================================================
    // TEST 2: all six categories sum to 125 without contact/history bonuses
    // ========================================================================
    #[test]
    fn test_all_categories_sum_125() {
        let mut s = all_signals();
        s.emails.clear();
        s.phones.clear();
        let score = score_turn(&s, 0);
        assert_eq!(score, 25 + 20 + 15 + 20 + 30 + 15);
        assert_eq!(status_for(score), LeadStatus::Hot);
    }

    // ========================================================================
    // TEST 3: maximum single-turn score is 200 — deliberately unclamped
    // ========================================================================
    #[test]
    fn test_max_turn_score_is_200_unclamped() {
        let score = score_turn(&all_signals(), 6);
        assert_eq!(score, 200, "the score is not clamped to 100");
    }

    // ========================================================================
    // TEST 4: status thresholds at the exact boundaries
    // ========================================================================
    #[test]
    fn test_status_thresholds() {
        assert_eq!(status_for(70), LeadStatus::Hot);
        assert_eq!(status_for(69), LeadStatus::Warm);
        assert_eq!(status_for(40), LeadStatus::Warm);
        assert_eq!(status_for(39), LeadStatus::Cold);
        assert_eq!(status_for(0), LeadStatus::Cold);
    }

    // ========================================================================
    // TEST 5: history bonus applies strictly above five prior turns
    // ========================================================================
    #[test]
    fn test_history_bonus_boundary() {
        let s = SignalSet::default();
        assert_eq!(score_turn(&s, 5), 0);
        assert_eq!(score_turn(&s, 6), WEIGHT_LONG_HISTORY);
    }

    // ========================================================================
    // TEST 6: complexity cascade is first-match-wins, enterprise first
    // ========================================================================
    #[test]
    fn test_complexity_priority_order() {
        // both "erp" (enterprise) and "blog" (simple) present
        let c = classify_complexity("Un ERP interne avec un blog d'actualités");
        assert_eq!(c, ProjectComplexity::Enterprise);

        let c = classify_complexity("Une marketplace multi-vendeur");
        assert_eq!(c, ProjectComplexity::Complex);

        let c = classify_complexity("Une boutique en ligne classique");
        assert_eq!(c, ProjectComplexity::Medium);

        let c = classify_complexity("Un site vitrine pour mon cabinet");
        assert_eq!(c, ProjectComplexity::Simple);
    }

    // ========================================================================
    // TEST 7: no cascade match yields Unknown
    // ========================================================================
    #[test]
    fn test_complexity_unknown_when_no_match() {
        assert_eq!(
            classify_complexity("Bonjour, comment allez-vous ?"),
            ProjectComplexity::Unknown
        );
    }
}
