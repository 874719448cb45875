use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub session_id: String,
    pub messages: serde_json::Value,
    pub lead_score: i32,
    pub lead_status: String,
    pub project_complexity: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub user_agent: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}
