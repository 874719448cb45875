use crate::error::LeadlineError;
use crate::models::ChatMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LeadlineRequest {
    Ping,
    Health,
    Chat {
        message: String,
        #[serde(default)]
        conversation_history: Vec<ChatMessage>,
        session_id: Option<String>,
        user_agent: Option<String>,
    },
    Leads {
        limit: Option<u32>,
    },
    Conversation {
        session_id: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LeadlineResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl LeadlineResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: "0.1.0".to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: "0.1.0".to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }
}

// Frame payloads are MessagePack; the transport adds the length prefix.

pub fn decode_request(bytes: &[u8]) -> Result<LeadlineRequest, LeadlineError> {
    rmp_serde::from_slice(bytes).map_err(|e| LeadlineError::Ipc(format!("bad request frame: {}", e)))
}

pub fn encode_response(response: &LeadlineResponse) -> Result<Vec<u8>, LeadlineError> {
    rmp_serde::to_vec_named(response)
        .map_err(|e| LeadlineError::Ipc(format!("bad response frame: {}", e)))
}
