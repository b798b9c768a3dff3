// src/db/location_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    models::{
        locations::{LocationUpsert, UserLocation},
        tenancy::TenantScope,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Uma linha por (user_id, ride_id); a nova posição substitui a anterior.
    async fn upsert_location(&self, scope: &TenantScope, upsert: LocationUpsert) -> Result<UserLocation, AppError>;

    async fn list_locations(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<UserLocation>, AppError>;
}

#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationStore for LocationRepository {
    async fn upsert_location(&self, scope: &TenantScope, upsert: LocationUpsert) -> Result<UserLocation, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let location = sqlx::query_as::<_, UserLocation>(
            r#"
            INSERT INTO user_locations (tenant_id, ride_id, user_id, user_type, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, ride_id) DO UPDATE SET
                user_type = EXCLUDED.user_type,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(scope.tenant_id)
        .bind(upsert.ride_id)
        .bind(upsert.user_id)
        .bind(upsert.user_type)
        .bind(upsert.latitude)
        .bind(upsert.longitude)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(location)
    }

    async fn list_locations(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<UserLocation>, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let locations = sqlx::query_as::<_, UserLocation>(
            r#"
            SELECT * FROM user_locations
            WHERE ride_id = $1 AND tenant_id = $2
            ORDER BY updated_at ASC
            "#,
        )
        .bind(ride_id)
        .bind(scope.tenant_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(locations)
    }
}
