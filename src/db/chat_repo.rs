// src/db/chat_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    models::{
        chat::{Message, NewMessage},
        tenancy::TenantScope,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, scope: &TenantScope, new_message: NewMessage) -> Result<Message, AppError>;

    async fn list_messages(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<Message>, AppError>;
}

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn insert_message(&self, scope: &TenantScope, new_message: NewMessage) -> Result<Message, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (tenant_id, ride_id, sender_id, sender_name, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(scope.tenant_id)
        .bind(new_message.ride_id)
        .bind(new_message.sender_id)
        .bind(&new_message.sender_name)
        .bind(&new_message.content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn list_messages(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<Message>, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE ride_id = $1 AND tenant_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(ride_id)
        .bind(scope.tenant_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(messages)
    }
}
