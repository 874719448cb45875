//! Chat orchestration — one qualification turn end to end
//!
//! validate → extract signals → score → LLM reply → CTA augmentation →
//! persist → assemble the widget response. Each turn is one synchronous
//! request/response cycle; the only suspension points are the model call
//! and the database transaction. Errors propagate to the transport layer,
//! which decides how to surface them (the HTTP chat endpoint collapses
//! everything into the canned fallback reply).

use anyhow::Result;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use leadline_core::llm::{ChatBackend, ChatConfig, ChatError, GeminiChatClient};
use leadline_core::models::ChatMessage;
use leadline_core::LeadlineConfig;

use super::{engage, persist, scoring, signals};

/// System instruction sent with every model call.
const PERSONA: &str = "Tu es l'assistant virtuel d'un consultant digital indépendant. \
Tu réponds en français, de manière concise et professionnelle. Tu aides les visiteurs \
à préciser leur projet web (site, e-commerce, SEO, automatisation) et tu les orientes \
vers une prise de contact quand c'est pertinent. Tu ne donnes jamais de prix ferme \
sans un échange préalable.";

// ============================================================================
// Turn input / output
// ============================================================================

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub message: String,
    pub history: Vec<ChatMessage>,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
}

/// The full widget-facing result of one turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnOutcome {
    pub response: String,
    pub session_id: String,
    pub conversation_id: Uuid,
    /// Running maximum score after this turn.
    pub lead_score: i32,
    /// This turn's raw status — overwritten each turn, not a running max.
    pub lead_status: String,
    pub project_complexity: String,
    pub has_business_intent: bool,
    pub contextual_suggestions: Vec<String>,
    pub should_collect_email: bool,
    pub should_offer_consultation: bool,
    pub timestamp: String,
}

// ============================================================================
// Backend construction
// ============================================================================

/// Build the production Gemini backend with the consultant persona.
/// Fails fast on a missing `GOOGLE_API_KEY`.
pub fn create_chat_backend(config: &LeadlineConfig) -> Result<Box<dyn ChatBackend>, ChatError> {
    let client = GeminiChatClient::new(ChatConfig::new(None, &config.llm))?
        .with_system_instruction(PERSONA);
    Ok(Box::new(client))
}

// ============================================================================
// Turn execution
// ============================================================================

pub async fn run_chat_turn(
    turn: ChatTurn,
    pool: &PgPool,
    config: &LeadlineConfig,
    backend: &dyn ChatBackend,
) -> Result<ChatTurnOutcome> {
    let message = turn.message.trim();
    if message.is_empty() {
        anyhow::bail!("message is required");
    }

    let session_id = turn
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // The widget caps history to 10 turns; cap again server-side rather
    // than trusting the caller.
    let cap = config.chat.history_cap;
    let start = turn.history.len().saturating_sub(cap);
    let history = &turn.history[start..];

    let signals = signals::extract_signals(message);
    let turn_score = scoring::score_turn(&signals, history.len());
    let turn_status = scoring::status_for(turn_score);
    let turn_complexity = scoring::classify_complexity(message);

    tracing::debug!(
        session = %session_id,
        turn_score,
        status = turn_status.as_str(),
        complexity = turn_complexity.as_str(),
        backend = backend.name(),
        "Turn scored"
    );

    let reply = backend.reply(history, message).await?;
    let response = engage::augment_reply(&reply, turn_score, &signals, turn_complexity);

    let record = persist::record_turn(
        pool,
        &session_id,
        message,
        &response,
        turn.user_agent.as_deref(),
        &signals,
        turn_score,
        turn_status,
        turn_complexity,
    )
    .await?;

    Ok(ChatTurnOutcome {
        response,
        session_id,
        conversation_id: record.conversation_id,
        lead_score: record.stored_score,
        lead_status: turn_status.as_str().to_string(),
        project_complexity: record.stored_complexity,
        has_business_intent: signals.has_business_intent(),
        contextual_suggestions: engage::suggestions(&signals, turn_complexity),
        should_collect_email: engage::should_collect_email(
            record.email_known,
            record.stored_score,
        ),
        should_offer_consultation: engage::should_offer_consultation(turn_score),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
