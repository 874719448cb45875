//! Turn persistence — conversation upsert, analytics row, conditional lead
//!
//! Reconciles one chat turn with the stored conversation inside a single
//! transaction: the message log grows, the score merges as a running
//! maximum, the status is overwritten with the turn's raw status (it is
//! NOT monotonic — a hot conversation can read warm after a bland turn),
//! and a lead row is inserted at most once per (conversation, email).
//!
//! No row locking: two rapid-fire turns from the same session race
//! last-writer-wins on the message log. Accepted at this scale.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use leadline_core::models::{ChatMessage, Conversation, Lead};

use super::scoring::{self, LeadStatus, ProjectComplexity};
use super::signals::SignalSet;

// ============================================================================
// Public types
// ============================================================================

/// What one persisted turn looks like after the merge.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub conversation_id: Uuid,
    /// Running maximum score after this turn.
    pub stored_score: i32,
    /// Stored complexity after the overwrite-if-classified merge.
    pub stored_complexity: String,
    /// True when the conversation now has an email on file.
    pub email_known: bool,
    pub lead_created: bool,
}

// ============================================================================
// Write path
// ============================================================================

/// Persist one turn. The whole sequence — conversation upsert, analytics
/// insert, lead insert — runs in one transaction so a mid-sequence failure
/// cannot leave a conversation without its analytics row or lead.
#[allow(clippy::too_many_arguments)]
pub async fn record_turn(
    pool: &PgPool,
    session_id: &str,
    user_message: &str,
    assistant_reply: &str,
    user_agent: Option<&str>,
    signals: &SignalSet,
    turn_score: i32,
    turn_status: LeadStatus,
    turn_complexity: ProjectComplexity,
) -> Result<TurnRecord> {
    let turn_messages = serde_json::to_value(vec![
        ChatMessage::user(user_message),
        ChatMessage::assistant(assistant_reply),
    ])?;
    let extracted_email = signals.emails.first().map(|s| s.as_str());
    let extracted_phone = signals.phones.first().map(|s| s.as_str());

    let mut tx = pool.begin().await?;

    let existing: Option<(Uuid, i32, String, Option<String>)> = sqlx::query_as(
        "SELECT id, lead_score, project_complexity, email \
         FROM conversations WHERE session_id = $1",
    )
    .bind(session_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (conversation_id, stored_score, stored_complexity, email_known) = match existing {
        Some((id, prev_score, prev_complexity, prev_email)) => {
            let stored_score = prev_score.max(turn_score);
            let stored_complexity =
                merge_complexity(&prev_complexity, turn_complexity).to_string();

            sqlx::query(
                "UPDATE conversations SET \
                     messages = messages || $2::jsonb, \
                     lead_score = $3, \
                     lead_status = $4, \
                     project_complexity = $5, \
                     email = COALESCE(email, $6), \
                     phone = COALESCE(phone, $7), \
                     last_active_at = now() \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(&turn_messages)
            .bind(stored_score)
            .bind(turn_status.as_str())
            .bind(&stored_complexity)
            .bind(extracted_email)
            .bind(extracted_phone)
            .execute(&mut *tx)
            .await?;

            let email_known = prev_email.is_some() || extracted_email.is_some();
            (id, stored_score, stored_complexity, email_known)
        }
        None => {
            let row: (Uuid,) = sqlx::query_as(
                "INSERT INTO conversations \
                     (session_id, messages, lead_score, lead_status, \
                      project_complexity, email, phone, user_agent) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 RETURNING id",
            )
            .bind(session_id)
            .bind(&turn_messages)
            .bind(turn_score)
            .bind(turn_status.as_str())
            .bind(turn_complexity.as_str())
            .bind(extracted_email)
            .bind(extracted_phone)
            .bind(user_agent)
            .fetch_one(&mut *tx)
            .await?;

            (
                row.0,
                turn_score,
                turn_complexity.as_str().to_string(),
                extracted_email.is_some(),
            )
        }
    };

    // Per-turn analytics snapshot (raw turn score, pre-merge)
    sqlx::query(
        "INSERT INTO chat_events (session_id, turn_score, turn_status, signals) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(session_id)
    .bind(turn_score)
    .bind(turn_status.as_str())
    .bind(serde_json::to_value(signals)?)
    .execute(&mut *tx)
    .await?;

    // A lead requires an email from this turn and a running score past the
    // minimum; the unique (conversation_id, email) key makes re-sends a no-op.
    let mut lead_created = false;
    if stored_score >= scoring::LEAD_MIN_SCORE {
        for email in &signals.emails {
            let result = sqlx::query(
                "INSERT INTO leads \
                     (conversation_id, email, phone, qualification_score, urgency, status) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (conversation_id, email) DO NOTHING",
            )
            .bind(conversation_id)
            .bind(email)
            .bind(extracted_phone)
            .bind(stored_score)
            .bind(urgency_level(signals.urgency_signals))
            .bind(lead_status_label(stored_score))
            .execute(&mut *tx)
            .await?;

            lead_created |= result.rows_affected() > 0;
        }
    }

    tx.commit().await?;

    tracing::info!(
        session = session_id,
        score = stored_score,
        status = turn_status.as_str(),
        lead_created,
        "Turn persisted"
    );

    Ok(TurnRecord {
        conversation_id,
        stored_score,
        stored_complexity,
        email_known,
        lead_created,
    })
}

// ============================================================================
// Merge helpers (pure, tested below)
// ============================================================================

/// A turn that classified overwrites; an Unknown turn preserves the stored
/// value.
fn merge_complexity(prev: &str, turn: ProjectComplexity) -> &str {
    match turn {
        ProjectComplexity::Unknown => prev,
        other => other.as_str(),
    }
}

/// Binary urgency level for the lead row — there is no "low".
fn urgency_level(urgency_fired: bool) -> &'static str {
    if urgency_fired {
        "high"
    } else {
        "medium"
    }
}

fn lead_status_label(score: i32) -> &'static str {
    if score >= scoring::QUALIFIED_SCORE {
        "qualified"
    } else {
        "new"
    }
}

// ============================================================================
// Read path
// ============================================================================

pub async fn recent_leads(pool: &PgPool, limit: u32) -> Result<Vec<Lead>> {
    let limit = limit.min(100) as i64;
    let leads = sqlx::query_as::<_, Lead>(
        "SELECT id, conversation_id, email, phone, qualification_score, \
                urgency, status, created_at \
         FROM leads ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(leads)
}

pub async fn conversation_by_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<Conversation>> {
    let conversation = sqlx::query_as::<_, Conversation>(
        "SELECT id, session_id, messages, lead_score, lead_status, \
                project_complexity, email, phone, user_agent, \
                started_at, last_active_at \
         FROM conversations WHERE session_id = $1",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;
    Ok(conversation)
}

// ============================================================================
// Tests — pure merge helpers; DB paths are covered in tests/
// ============================================================================
