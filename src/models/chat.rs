// src/models/chat.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const MAX_MESSAGE_CHARS: u64 = 2000;

// Mensagens são só acrescentadas, nunca editadas
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub ride_id: i64,
    pub sender_id: Uuid,
    #[schema(example = "Ana Souza")]
    pub sender_name: String,
    #[schema(example = "Estou saindo agora!")]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub ride_id: i64,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendMessagePayload {
    #[validate(length(max = 2000, message = "message_too_long"))]
    #[schema(example = "Estou saindo agora!")]
    pub content: String,
}

/// Remove espaços das pontas. `None` quando não sobra nada para enviar.
pub fn normalize_content(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_is_dropped() {
        assert_eq!(normalize_content("   \n\t"), None);
        assert_eq!(normalize_content("  oi  ").as_deref(), Some("oi"));
    }

    #[test]
    fn long_messages_fail_validation() {
        let payload = SendMessagePayload { content: "a".repeat(MAX_MESSAGE_CHARS as usize + 1) };
        assert!(payload.validate().is_err());
    }
}
