// src/db/classified_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    models::{
        classifieds::{Classified, ClassifiedPayload},
        tenancy::TenantScope,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassifiedStore: Send + Sync {
    /// O autor é `scope.user_id`.
    async fn insert_classified(&self, scope: &TenantScope, payload: ClassifiedPayload) -> Result<Classified, AppError>;

    /// Todos os anúncios da organização, mais novos primeiro.
    async fn list_classifieds(&self, scope: &TenantScope) -> Result<Vec<Classified>, AppError>;

    async fn find_classified(&self, scope: &TenantScope, id: i64) -> Result<Option<Classified>, AppError>;

    async fn update_classified(
        &self,
        scope: &TenantScope,
        id: i64,
        payload: ClassifiedPayload,
    ) -> Result<Option<Classified>, AppError>;

    /// `true` se alguma linha foi apagada.
    async fn delete_classified(&self, scope: &TenantScope, id: i64) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct ClassifiedRepository {
    pool: PgPool,
}

impl ClassifiedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClassifiedStore for ClassifiedRepository {
    async fn insert_classified(&self, scope: &TenantScope, payload: ClassifiedPayload) -> Result<Classified, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let classified = sqlx::query_as::<_, Classified>(
            r#"
            INSERT INTO classifieds (
                tenant_id, user_id, title, description, price,
                category, location, contact_info, image_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(scope.tenant_id)
        .bind(scope.user_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.price)
        .bind(&payload.category)
        .bind(&payload.location)
        .bind(&payload.contact_info)
        .bind(&payload.image_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(classified)
    }

    async fn list_classifieds(&self, scope: &TenantScope) -> Result<Vec<Classified>, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let classifieds = sqlx::query_as::<_, Classified>(
            "SELECT * FROM classifieds WHERE tenant_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(scope.tenant_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(classifieds)
    }

    async fn find_classified(&self, scope: &TenantScope, id: i64) -> Result<Option<Classified>, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let classified = sqlx::query_as::<_, Classified>(
            "SELECT * FROM classifieds WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(scope.tenant_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(classified)
    }

    async fn update_classified(
        &self,
        scope: &TenantScope,
        id: i64,
        payload: ClassifiedPayload,
    ) -> Result<Option<Classified>, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        // status ausente mantém o atual
        let classified = sqlx::query_as::<_, Classified>(
            r#"
            UPDATE classifieds SET
                title = $3,
                description = $4,
                price = $5,
                category = $6,
                location = $7,
                contact_info = $8,
                image_url = $9,
                status = COALESCE($10, status),
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(scope.tenant_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.price)
        .bind(&payload.category)
        .bind(&payload.location)
        .bind(&payload.contact_info)
        .bind(&payload.image_url)
        .bind(payload.status)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(classified)
    }

    async fn delete_classified(&self, scope: &TenantScope, id: i64) -> Result<bool, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let deleted = sqlx::query("DELETE FROM classifieds WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(scope.tenant_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }
}
