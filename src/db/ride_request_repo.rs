// src/db/ride_request_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    models::{
        ride_requests::{Decision, NewRideRequest, RequestStatus, RideRequest},
        tenancy::TenantScope,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RideRequestStore: Send + Sync {
    async fn insert_request(
        &self,
        scope: &TenantScope,
        new_request: NewRideRequest,
    ) -> Result<RideRequest, AppError>;

    /// Mais antigos primeiro.
    async fn list_for_ride(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<RideRequest>, AppError>;

    async fn find_request(&self, scope: &TenantScope, request_id: i64) -> Result<Option<RideRequest>, AppError>;

    /// Numa transação só: trava o pedido, exige que esteja pendente e, no aceite,
    /// desconta os assentos da carona se houver lugar suficiente.
    async fn decide(
        &self,
        scope: &TenantScope,
        request_id: i64,
        decision: Decision,
    ) -> Result<RideRequest, AppError>;

    async fn has_accepted_request(
        &self,
        scope: &TenantScope,
        ride_id: i64,
        user_id: Uuid,
    ) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct RideRequestRepository {
    pool: PgPool,
}

impl RideRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RideRequestStore for RideRequestRepository {
    async fn insert_request(
        &self,
        scope: &TenantScope,
        new_request: NewRideRequest,
    ) -> Result<RideRequest, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let request = sqlx::query_as::<_, RideRequest>(
            r#"
            INSERT INTO ride_requests (
                tenant_id, ride_id, requester_id, requester_name, seats_requested,
                is_recurring, recurring_days, recurring_until
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(scope.tenant_id)
        .bind(new_request.ride_id)
        .bind(new_request.requester_id)
        .bind(&new_request.requester_name)
        .bind(new_request.seats_requested)
        .bind(new_request.recurrence.is_recurring)
        .bind(&new_request.recurrence.days)
        .bind(new_request.recurrence.until)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    async fn list_for_ride(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<RideRequest>, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let requests = sqlx::query_as::<_, RideRequest>(
            r#"
            SELECT * FROM ride_requests
            WHERE ride_id = $1 AND tenant_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(ride_id)
        .bind(scope.tenant_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(requests)
    }

    async fn find_request(&self, scope: &TenantScope, request_id: i64) -> Result<Option<RideRequest>, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let request = sqlx::query_as::<_, RideRequest>(
            "SELECT * FROM ride_requests WHERE id = $1 AND tenant_id = $2",
        )
        .bind(request_id)
        .bind(scope.tenant_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    async fn decide(
        &self,
        scope: &TenantScope,
        request_id: i64,
        decision: Decision,
    ) -> Result<RideRequest, AppError> {
        // 1. Inicia a transação (qualquer `?` abaixo faz rollback no drop)
        let mut tx = begin_scoped(&self.pool, scope).await?;

        // 2. Trava o pedido: duas decisões simultâneas não passam as duas
        let current = sqlx::query_as::<_, RideRequest>(
            "SELECT * FROM ride_requests WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(request_id)
        .bind(scope.tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::RequestNotFound(request_id))?;

        if current.status.is_terminal() {
            return Err(AppError::RequestAlreadyDecided(current.status));
        }

        // 3. No aceite, desconta os assentos de forma condicional
        if decision == Decision::Accepted {
            let updated = sqlx::query(
                r#"
                UPDATE rides
                SET seats_available = seats_available - $1, updated_at = now()
                WHERE id = $2 AND tenant_id = $3 AND seats_available >= $1
                "#,
            )
            .bind(current.seats_requested)
            .bind(current.ride_id)
            .bind(scope.tenant_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if updated == 0 {
                let available: i32 = sqlx::query_scalar(
                    "SELECT seats_available FROM rides WHERE id = $1 AND tenant_id = $2",
                )
                .bind(current.ride_id)
                .bind(scope.tenant_id)
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or(0);

                return Err(AppError::InsufficientSeats {
                    requested: current.seats_requested,
                    available,
                });
            }
        }

        // 4. Grava a decisão
        let decided = sqlx::query_as::<_, RideRequest>(
            r#"
            UPDATE ride_requests SET status = $1, updated_at = now()
            WHERE id = $2 AND tenant_id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(decision.status())
        .bind(request_id)
        .bind(scope.tenant_id)
        .bind(RequestStatus::Pending)
        .fetch_one(&mut *tx)
        .await?;

        // 5. Commit
        tx.commit().await?;
        Ok(decided)
    }

    async fn has_accepted_request(
        &self,
        scope: &TenantScope,
        ride_id: i64,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM ride_requests
                WHERE ride_id = $1 AND tenant_id = $2 AND requester_id = $3 AND status = $4
            )
            "#,
        )
        .bind(ride_id)
        .bind(scope.tenant_id)
        .bind(user_id)
        .bind(RequestStatus::Accepted)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(exists)
    }
}
