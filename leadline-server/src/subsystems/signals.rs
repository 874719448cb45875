//! Signal extraction — per-turn keyword classification
//!
//! Classifies a single user message against six fixed categories (budget,
//! project, urgency, company, decision-maker, technical needs) and extracts
//! contact details. Categories are independent any-match tests over the
//! lowercased message; emails and phones are collected in text order.
//!
//! Extraction is stateless across turns: every turn is classified fresh and
//! only the scoring layer carries state forward (via the stored running
//! maximum). No normalization or false-positive suppression is applied —
//! the phone pattern in particular accepts any long digit run.

use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Signal set
// ============================================================================

/// Fixed-shape classification of one user turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalSet {
    pub budget_mentioned: bool,
    pub project_mentioned: bool,
    pub urgency_signals: bool,
    pub company_context: bool,
    pub decision_maker: bool,
    pub technical_needs: bool,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
}

impl SignalSet {
    /// True when any of the six category tests fired.
    pub fn has_business_intent(&self) -> bool {
        self.budget_mentioned
            || self.project_mentioned
            || self.urgency_signals
            || self.company_context
            || self.decision_maker
            || self.technical_needs
    }
}

// ============================================================================
// Keyword tables (French-first audience, English variants included)
// ============================================================================

const BUDGET_KEYWORDS: &[&str] = &[
    "budget", "tarif", "prix", "coût", "cout", "devis", "enveloppe", "investir",
    "investissement", "€", "euro", "dirham", " dh", " mad",
];

// Numeric budget shapes: "50k", "50 k€", "10 000 €", "5000 eur"
const BUDGET_PATTERNS: &[&str] = &[r"\d+\s*k\b", r"\d+\s*k?(?:€|eur)"];

const PROJECT_KEYWORDS: &[&str] = &[
    "projet", "project", "site web", "site internet", "un site", "application",
    "appli", "app mobile", "refonte", "développer", "developper", "développement",
    "developpement", "créer", "creer", "lancer", "website", "boutique",
];

const URGENCY_KEYWORDS: &[&str] = &[
    "urgent", "urgence", "rapidement", "vite", "asap", "dès que possible",
    "des que possible", "au plus vite", "cette semaine", "deadline",
    "délai court", "delai court", "pressé", "presse",
];

const COMPANY_KEYWORDS: &[&str] = &[
    "entreprise", "société", "societe", "company", "startup", "start-up", "pme",
    "agence", "notre équipe", "notre equipe", "nos clients", "mon activité",
    "mon activite", "business",
];

const DECISION_MAKER_KEYWORDS: &[&str] = &[
    "ceo", "cto", "fondateur", "fondatrice", "founder", "directeur", "directrice",
    "gérant", "gerant", "président", "president", "responsable", "décideur",
    "decideur", "je décide", "je decide", "mon entreprise", "ma société",
    "ma societe",
];

const TECHNICAL_KEYWORDS: &[&str] = &[
    "api", "intégration", "integration", "seo", "référencement", "referencement",
    "e-commerce", "ecommerce", "paiement en ligne", "base de données",
    "base de donnees", "backend", "frontend", "crm", "automatisation",
    "automation", "hébergement", "hebergement", "analytics", "wordpress",
];

const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";

// Loose international shape: optional "+", then 9+ digits with spaces, dots
// or dashes allowed between them. Broad enough to also match prices and
// other long digit runs; that misclassification is part of the contract.
const PHONE_PATTERN: &str = r"\+?\d[\d\s.\-]{7,}\d";

// ============================================================================
// Extraction
// ============================================================================

/// Classify one user message. Category tests read the lowercased text;
/// email/phone extraction reads the raw text to preserve what was typed.
pub fn extract_signals(message: &str) -> SignalSet {
    let lower = message.to_lowercase();

    SignalSet {
        budget_mentioned: contains_any(&lower, BUDGET_KEYWORDS)
            || matches_any(&lower, BUDGET_PATTERNS),
        project_mentioned: contains_any(&lower, PROJECT_KEYWORDS),
        urgency_signals: contains_any(&lower, URGENCY_KEYWORDS),
        company_context: contains_any(&lower, COMPANY_KEYWORDS),
        decision_maker: contains_any(&lower, DECISION_MAKER_KEYWORDS),
        technical_needs: contains_any(&lower, TECHNICAL_KEYWORDS),
        emails: find_all(message, EMAIL_PATTERN),
        phones: find_all(message, PHONE_PATTERN)
            .into_iter()
            .map(|p| p.trim().to_string())
            .collect(),
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

fn matches_any(text: &str, patterns: &[&str]) -> bool {
    for pattern in patterns {
        if let Ok(re) = Regex::new(pattern) {
            if re.is_match(text) {
                return true;
            }
        }
    }
    false
}

/// All non-overlapping matches, in text order.
fn find_all(text: &str, pattern: &str) -> Vec<String> {
    match Regex::new(pattern) {
        Ok(re) => re.find_iter(text).map(|m| m.as_str().to_string()).collect(),
        Err(_) => Vec::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================
