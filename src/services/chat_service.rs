// src/services/chat_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::MessageStore,
    models::{
        auth::display_name_or_anonymous,
        chat::{normalize_content, Message, NewMessage, MAX_MESSAGE_CHARS},
        tenancy::TenantScope,
    },
    services::{
        realtime::{RealtimeHub, RideEvent},
        ride_service::RideService,
    },
};

#[derive(Clone)]
pub struct ChatService {
    rides: RideService,
    messages: Arc<dyn MessageStore>,
    hub: Arc<RealtimeHub>,
}

impl ChatService {
    pub fn new(rides: RideService, messages: Arc<dyn MessageStore>, hub: Arc<RealtimeHub>) -> Self {
        Self { rides, messages, hub }
    }

    /// Sem nova tentativa automática: se falhar, o erro volta para quem enviou.
    pub async fn send_message(
        &self,
        scope: &TenantScope,
        sender_name: Option<&str>,
        ride_id: i64,
        content: &str,
    ) -> Result<Message, AppError> {
        let content = normalize_content(content).ok_or(AppError::EmptyMessage)?;
        if content.chars().count() as u64 > MAX_MESSAGE_CHARS {
            return Err(AppError::InvalidField { field: "content", key: "message_too_long" });
        }

        self.rides.require_participant(scope, ride_id).await?;

        let message = self
            .messages
            .insert_message(
                scope,
                NewMessage {
                    ride_id,
                    sender_id: scope.user_id,
                    sender_name: display_name_or_anonymous(sender_name).to_string(),
                    content,
                },
            )
            .await?;

        self.hub.publish(ride_id, RideEvent::MessagePosted(message.clone()));
        Ok(message)
    }

    pub async fn list_messages(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<Message>, AppError> {
        self.rides.get_ride(scope, ride_id).await?;
        self.messages.list_messages(scope, ride_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::chat_repo::MockMessageStore,
        services::ride_service::tests::payload,
        test_support::MemoryStore,
    };
    use uuid::Uuid;

    fn services(store: &Arc<MemoryStore>) -> (RideService, ChatService) {
        let hub = RealtimeHub::new();
        let rides = RideService::new(store.clone(), store.clone(), hub.clone());
        let chat = ChatService::new(rides.clone(), store.clone(), hub);
        (rides, chat)
    }

    #[tokio::test]
    async fn messages_are_trimmed_and_listed_in_order() {
        let store = MemoryStore::new();
        let driver = TenantScope::new(store.seed_tenant("ACME").id, Uuid::new_v4());
        let (rides, chat) = services(&store);
        let ride = rides.create_ride(&driver, Some("Ana"), payload("A", "B", 2)).await.unwrap();

        chat.send_message(&driver, Some("Ana"), ride.id, "  Saindo agora  ").await.unwrap();
        chat.send_message(&driver, Some("Ana"), ride.id, "Cheguei").await.unwrap();

        let listed = chat.list_messages(&driver, ride.id).await.unwrap();
        let contents: Vec<&str> = listed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Saindo agora", "Cheguei"]);
        assert_eq!(listed[0].sender_name, "Ana");
    }

    #[tokio::test]
    async fn blank_messages_are_rejected() {
        let store = MemoryStore::new();
        let driver = TenantScope::new(store.seed_tenant("ACME").id, Uuid::new_v4());
        let (rides, chat) = services(&store);
        let ride = rides.create_ride(&driver, None, payload("A", "B", 2)).await.unwrap();

        let err = chat.send_message(&driver, None, ride.id, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyMessage));
        assert!(chat.list_messages(&driver, ride.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outsiders_cannot_post() {
        let store = MemoryStore::new();
        let tenant = store.seed_tenant("ACME").id;
        let driver = TenantScope::new(tenant, Uuid::new_v4());
        let outsider = TenantScope::new(tenant, Uuid::new_v4());
        let (rides, chat) = services(&store);
        let ride = rides.create_ride(&driver, None, payload("A", "B", 2)).await.unwrap();

        let err = chat.send_message(&outsider, None, ride.id, "oi").await.unwrap_err();
        assert!(matches!(err, AppError::NotRideParticipant));
    }

    #[tokio::test]
    async fn insert_failures_are_not_retried() {
        let store = MemoryStore::new();
        let driver = TenantScope::new(store.seed_tenant("ACME").id, Uuid::new_v4());
        let rides = RideService::new(store.clone(), store.clone(), RealtimeHub::new());
        let ride = rides.create_ride(&driver, None, payload("A", "B", 2)).await.unwrap();

        let mut mock = MockMessageStore::new();
        mock.expect_insert_message()
            .times(1)
            .returning(|_, _| Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut)));
        let chat = ChatService::new(rides, Arc::new(mock), RealtimeHub::new());

        let err = chat.send_message(&driver, None, ride.id, "oi").await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
