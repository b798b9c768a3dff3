// src/services/ride_request_service.rs

use std::sync::Arc;

use crate::{
    common::{error::AppError, i18n::I18nStore},
    db::RideRequestStore,
    models::{
        auth::display_name_or_anonymous,
        ride_requests::{
            decision_notice, role_of, Decision, DecisionOutcome, NewRideRequest, RequestSeatPayload, RideRequest,
        },
        rides::{Recurrence, RideStatus},
        tenancy::TenantScope,
    },
    services::{
        realtime::{RealtimeHub, RideEvent},
        ride_service::RideService,
    },
};

#[derive(Clone)]
pub struct RideRequestService {
    rides: RideService,
    requests: Arc<dyn RideRequestStore>,
    hub: Arc<RealtimeHub>,
    i18n: Arc<I18nStore>,
}

impl RideRequestService {
    pub fn new(
        rides: RideService,
        requests: Arc<dyn RideRequestStore>,
        hub: Arc<RealtimeHub>,
        i18n: Arc<I18nStore>,
    ) -> Self {
        Self { rides, requests, hub, i18n }
    }

    /// Pede lugar numa carona ainda pendente. O pedido nasce `pending`.
    pub async fn request_seat(
        &self,
        scope: &TenantScope,
        requester_name: Option<&str>,
        ride_id: i64,
        payload: RequestSeatPayload,
    ) -> Result<RideRequest, AppError> {
        let ride = self.rides.get_ride(scope, ride_id).await?;

        if ride.is_driver(scope.user_id) {
            return Err(AppError::CannotRequestOwnRide);
        }
        if ride.ride_status != RideStatus::Pending {
            return Err(AppError::RideNotOpen);
        }
        if payload.seats_requested < 1 {
            return Err(AppError::InvalidField { field: "seatsRequested", key: "min_seats" });
        }

        let recurrence = Recurrence::normalize(
            payload.is_recurring,
            payload.recurring_days,
            payload.recurring_until,
            Some(ride.departure_date),
        )?;

        let request = self
            .requests
            .insert_request(
                scope,
                NewRideRequest {
                    ride_id,
                    requester_id: scope.user_id,
                    requester_name: display_name_or_anonymous(requester_name).to_string(),
                    seats_requested: payload.seats_requested,
                    recurrence,
                },
            )
            .await?;

        self.hub.publish(ride_id, RideEvent::RequestCreated(request.clone()));
        Ok(request)
    }

    /// Mais antigos primeiro. Lista vazia não é erro.
    pub async fn list_requests(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<RideRequest>, AppError> {
        self.rides.get_ride(scope, ride_id).await?;
        self.requests.list_for_ride(scope, ride_id).await
    }

    /// Aceita ou recusa um pedido. Só o motorista da carona decide, uma única vez.
    /// O aviso devolvido é o de quem decidiu, no idioma `lang`.
    pub async fn decide_request(
        &self,
        scope: &TenantScope,
        lang: &str,
        request_id: i64,
        decision: Decision,
    ) -> Result<DecisionOutcome, AppError> {
        let request = self
            .requests
            .find_request(scope, request_id)
            .await?
            .ok_or(AppError::RequestNotFound(request_id))?;

        let ride = self.rides.get_ride(scope, request.ride_id).await?;
        if !ride.is_driver(scope.user_id) {
            return Err(AppError::NotRideDriver);
        }

        let decided = self.requests.decide(scope, request_id, decision).await?;
        tracing::info!(
            "Pedido {} da carona {}: {}",
            decided.id,
            decided.ride_id,
            decided.status.as_str()
        );

        self.hub.publish(decided.ride_id, RideEvent::RequestDecided(decided.clone()));

        let notice = decision_notice(&decided, role_of(scope.user_id, &decided), lang, &self.i18n);
        Ok(DecisionOutcome { request: decided, notice })
    }
}
