// src/db/ride_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    models::{
        rides::{ListRidesQuery, NewRide, Ride, RideSort, RideStatus},
        tenancy::TenantScope,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RideStore: Send + Sync {
    async fn insert_ride(&self, scope: &TenantScope, new_ride: NewRide) -> Result<Ride, AppError>;

    async fn list_rides(&self, scope: &TenantScope, query: ListRidesQuery) -> Result<Vec<Ride>, AppError>;

    async fn find_ride(&self, scope: &TenantScope, ride_id: i64) -> Result<Option<Ride>, AppError>;

    /// Troca o status só se a carona ainda estiver em `from`.
    /// `None` quando a condição falhou (ou a carona não existe).
    async fn transition_status(
        &self,
        scope: &TenantScope,
        ride_id: i64,
        from: RideStatus,
        to: RideStatus,
    ) -> Result<Option<Ride>, AppError>;
}

#[derive(Clone)]
pub struct RideRepository {
    pool: PgPool,
}

impl RideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RideStore for RideRepository {
    async fn insert_ride(&self, scope: &TenantScope, new_ride: NewRide) -> Result<Ride, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let ride = sqlx::query_as::<_, Ride>(
            r#"
            INSERT INTO rides (
                tenant_id, driver_id, driver_name,
                from_location, to_location,
                from_latitude, from_longitude, to_latitude, to_longitude, distance,
                departure_date, departure_time, seats_available,
                is_recurring, recurring_days, recurring_until
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(scope.tenant_id)
        .bind(new_ride.driver_id)
        .bind(&new_ride.driver_name)
        .bind(&new_ride.from_location)
        .bind(&new_ride.to_location)
        .bind(new_ride.from_point.map(|p| p.latitude))
        .bind(new_ride.from_point.map(|p| p.longitude))
        .bind(new_ride.to_point.map(|p| p.latitude))
        .bind(new_ride.to_point.map(|p| p.longitude))
        .bind(&new_ride.distance)
        .bind(new_ride.departure_date)
        .bind(new_ride.departure_time)
        .bind(new_ride.seats_available)
        .bind(new_ride.recurrence.is_recurring)
        .bind(&new_ride.recurrence.days)
        .bind(new_ride.recurrence.until)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ride)
    }

    async fn list_rides(&self, scope: &TenantScope, query: ListRidesQuery) -> Result<Vec<Ride>, AppError> {
        // ORDER BY não aceita bind; a direção vem de um enum fechado
        let order = match query.sort.unwrap_or_default() {
            RideSort::Newest => "created_at DESC, id DESC",
            RideSort::Oldest => "created_at ASC, id ASC",
        };
        let sql = format!(
            r#"
            SELECT * FROM rides
            WHERE tenant_id = $1
              AND ($2::ride_status IS NULL OR ride_status = $2)
            ORDER BY {}
            "#,
            order
        );

        let mut tx = begin_scoped(&self.pool, scope).await?;

        let rides = sqlx::query_as::<_, Ride>(&sql)
            .bind(scope.tenant_id)
            .bind(query.status)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(rides)
    }

    async fn find_ride(&self, scope: &TenantScope, ride_id: i64) -> Result<Option<Ride>, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let ride = sqlx::query_as::<_, Ride>("SELECT * FROM rides WHERE id = $1 AND tenant_id = $2")
            .bind(ride_id)
            .bind(scope.tenant_id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ride)
    }

    async fn transition_status(
        &self,
        scope: &TenantScope,
        ride_id: i64,
        from: RideStatus,
        to: RideStatus,
    ) -> Result<Option<Ride>, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let ride = sqlx::query_as::<_, Ride>(
            r#"
            UPDATE rides SET ride_status = $1, updated_at = now()
            WHERE id = $2 AND tenant_id = $3 AND ride_status = $4
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(ride_id)
        .bind(scope.tenant_id)
        .bind(from)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ride)
    }
}
