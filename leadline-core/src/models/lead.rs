use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub qualification_score: i32,
    pub urgency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
