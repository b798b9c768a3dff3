// src/db/tenancy_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_as_user, error::AppError},
    models::tenancy::{NewProfile, Profile, Tenant, UpdateProfilePayload},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn create_tenant(&self, name: &str) -> Result<Tenant, AppError>;

    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, AppError>;

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError>;

    /// Idempotente: se o perfil já existe, devolve o existente.
    async fn create_profile(&self, new_profile: NewProfile) -> Result<Profile, AppError>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        payload: UpdateProfilePayload,
    ) -> Result<Option<Profile>, AppError>;
}

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantStore for TenantRepository {
    async fn create_tenant(&self, name: &str) -> Result<Tenant, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>("INSERT INTO tenants (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(tenant)
    }

    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    // Perfis ficam sob RLS; antes de conhecer a organização, a política
    // só libera a linha do próprio usuário (app.user_id).
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let mut tx = begin_as_user(&self.pool, user_id).await?;

        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(profile)
    }

    async fn create_profile(&self, new_profile: NewProfile) -> Result<Profile, AppError> {
        let mut tx = begin_as_user(&self.pool, new_profile.id).await?;

        // DO UPDATE "vazio" para o RETURNING devolver a linha também no conflito
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, tenant_id, email, full_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id
            RETURNING *
            "#,
        )
        .bind(new_profile.id)
        .bind(new_profile.tenant_id)
        .bind(&new_profile.email)
        .bind(&new_profile.full_name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(profile)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        payload: UpdateProfilePayload,
    ) -> Result<Option<Profile>, AppError> {
        let mut tx = begin_as_user(&self.pool, user_id).await?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET
                full_name = $2,
                avatar_url = $3,
                home_location = $4,
                home_latitude = $5,
                home_longitude = $6,
                office_location = $7,
                office_latitude = $8,
                office_longitude = $9,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&payload.full_name)
        .bind(&payload.avatar_url)
        .bind(&payload.home_location)
        .bind(payload.home_latitude)
        .bind(payload.home_longitude)
        .bind(&payload.office_location)
        .bind(payload.office_latitude)
        .bind(payload.office_longitude)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(profile)
    }
}
