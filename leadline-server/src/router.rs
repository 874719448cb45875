use crate::subsystems::{chat, persist};
use leadline_core::ipc::{LeadlineRequest, LeadlineResponse};
use sqlx::PgPool;

pub async fn handle_request(request: LeadlineRequest, pool: &PgPool) -> LeadlineResponse {
    handle_request_with_config(request, pool, None).await
}

/// Handle request with optional config (needed for the chat model)
pub async fn handle_request_with_config(
    request: LeadlineRequest,
    pool: &PgPool,
    config: Option<leadline_core::LeadlineConfig>,
) -> LeadlineResponse {
    match request {
        LeadlineRequest::Ping => LeadlineResponse::pong(),
        LeadlineRequest::Health => {
            let pg_ver = match leadline_core::db::health_check(pool).await {
                Ok(v) => v,
                Err(e) => return LeadlineResponse::err(format!("DB Health Check failed: {}", e)),
            };
            let tables = match leadline_core::db::check_schema(pool).await {
                Ok(n) => n,
                Err(e) => return LeadlineResponse::err(format!("Schema check failed: {}", e)),
            };
            LeadlineResponse::ok(serde_json::json!({
                "postgresql": pg_ver,
                "schema_tables": tables,
                "status": "healthy"
            }))
        }
        LeadlineRequest::Chat {
            message,
            conversation_history,
            session_id,
            user_agent,
        } => {
            let config = match config {
                Some(c) => c,
                None => {
                    return LeadlineResponse::err("No config available for chat");
                }
            };
            match handle_chat_request(
                chat::ChatTurn {
                    message,
                    history: conversation_history,
                    session_id,
                    user_agent,
                },
                pool,
                &config,
            )
            .await
            {
                Ok(outcome) => match serde_json::to_value(&outcome) {
                    Ok(data) => LeadlineResponse::ok(data),
                    Err(e) => LeadlineResponse::err(e.to_string()),
                },
                Err(e) => LeadlineResponse::err(e.to_string()),
            }
        }
        LeadlineRequest::Leads { limit } => {
            match persist::recent_leads(pool, limit.unwrap_or(20)).await {
                Ok(leads) => LeadlineResponse::ok(serde_json::json!({
                    "count": leads.len(),
                    "leads": leads,
                })),
                Err(e) => LeadlineResponse::err(e.to_string()),
            }
        }
        LeadlineRequest::Conversation { session_id } => {
            match persist::conversation_by_session(pool, &session_id).await {
                Ok(Some(conversation)) => match serde_json::to_value(&conversation) {
                    Ok(data) => LeadlineResponse::ok(data),
                    Err(e) => LeadlineResponse::err(e.to_string()),
                },
                Ok(None) => {
                    LeadlineResponse::err(format!("No conversation for session {}", session_id))
                }
                Err(e) => LeadlineResponse::err(e.to_string()),
            }
        }
    }
}

/// Build the model backend and run one qualification turn.
async fn handle_chat_request(
    turn: chat::ChatTurn,
    pool: &PgPool,
    config: &leadline_core::LeadlineConfig,
) -> anyhow::Result<chat::ChatTurnOutcome> {
    let backend = chat::create_chat_backend(config)?;
    chat::run_chat_turn(turn, pool, config, backend.as_ref()).await
}
