// src/services/ride_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{RideRequestStore, RideStore},
    models::{
        auth::display_name_or_anonymous,
        locations::UserType,
        rides::{format_distance, CreateRidePayload, GeoPoint, ListRidesQuery, NewRide, Recurrence, Ride, RideStatus},
        tenancy::TenantScope,
    },
    services::realtime::{RealtimeHub, RideEvent},
};

#[derive(Clone)]
pub struct RideService {
    rides: Arc<dyn RideStore>,
    requests: Arc<dyn RideRequestStore>,
    hub: Arc<RealtimeHub>,
}

fn required(field: &'static str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidField { field, key: "required" });
    }
    Ok(trimmed.to_string())
}

impl RideService {
    pub fn new(rides: Arc<dyn RideStore>, requests: Arc<dyn RideRequestStore>, hub: Arc<RealtimeHub>) -> Self {
        Self { rides, requests, hub }
    }

    /// Publica uma carona. O motorista é quem está logado.
    pub async fn create_ride(
        &self,
        scope: &TenantScope,
        driver_name: Option<&str>,
        payload: CreateRidePayload,
    ) -> Result<Ride, AppError> {
        let from_location = required("fromLocation", &payload.from_location)?;
        let to_location = required("toLocation", &payload.to_location)?;
        if payload.seats_available < 1 {
            return Err(AppError::InvalidField { field: "seatsAvailable", key: "min_seats" });
        }

        let from_point = GeoPoint::from_parts("fromLatitude", payload.from_latitude, payload.from_longitude)?;
        let to_point = GeoPoint::from_parts("toLatitude", payload.to_latitude, payload.to_longitude)?;

        let recurrence = Recurrence::normalize(
            payload.is_recurring,
            payload.recurring_days,
            payload.recurring_until,
            Some(payload.departure_date),
        )?;

        let new_ride = NewRide {
            driver_id: scope.user_id,
            driver_name: display_name_or_anonymous(driver_name).to_string(),
            from_location,
            to_location,
            from_point,
            to_point,
            distance: format_distance(from_point, to_point),
            departure_date: payload.departure_date,
            departure_time: payload.departure_time,
            seats_available: payload.seats_available,
            recurrence,
        };

        let ride = self.rides.insert_ride(scope, new_ride).await?;
        tracing::info!("🚗 Carona {} publicada por {}", ride.id, ride.driver_id);
        Ok(ride)
    }

    pub async fn list_rides(&self, scope: &TenantScope, query: ListRidesQuery) -> Result<Vec<Ride>, AppError> {
        self.rides.list_rides(scope, query).await
    }

    pub async fn get_ride(&self, scope: &TenantScope, ride_id: i64) -> Result<Ride, AppError> {
        self.rides
            .find_ride(scope, ride_id)
            .await?
            .ok_or(AppError::RideNotFound(ride_id))
    }

    /// pending -> in_progress, só pelo motorista.
    pub async fn start_ride(&self, scope: &TenantScope, ride_id: i64) -> Result<Ride, AppError> {
        let ride = self.get_ride(scope, ride_id).await?;

        if !ride.is_driver(scope.user_id) {
            return Err(AppError::NotRideDriver);
        }

        let target = RideStatus::InProgress;
        if !ride.ride_status.can_transition_to(target) {
            return Err(AppError::InvalidRideTransition { from: ride.ride_status, to: target });
        }

        // Condicional no banco: quem chegar depois perde
        let Some(started) = self
            .rides
            .transition_status(scope, ride_id, ride.ride_status, target)
            .await?
        else {
            // Outra requisição mudou o status no meio: relê para informar o atual
            let current = self.get_ride(scope, ride_id).await?;
            tracing::warn!("Carona {} mudou para {:?} antes de iniciar", ride_id, current.ride_status);
            return Err(AppError::InvalidRideTransition { from: current.ride_status, to: target });
        };

        tracing::info!("Carona {} iniciada", started.id);
        self.hub.publish(started.id, RideEvent::RideStarted(started.clone()));
        Ok(started)
    }

    /// Motorista, passageiro com pedido aceito, ou ninguém.
    pub async fn participant_type(&self, scope: &TenantScope, ride: &Ride) -> Result<Option<UserType>, AppError> {
        if ride.is_driver(scope.user_id) {
            return Ok(Some(UserType::Driver));
        }
        let accepted = self
            .requests
            .has_accepted_request(scope, ride.id, scope.user_id)
            .await?;
        Ok(accepted.then_some(UserType::Rider))
    }

    pub async fn require_participant(&self, scope: &TenantScope, ride_id: i64) -> Result<(Ride, UserType), AppError> {
        let ride = self.get_ride(scope, ride_id).await?;
        let user_type = self
            .participant_type(scope, &ride)
            .await?
            .ok_or(AppError::NotRideParticipant)?;
        Ok((ride, user_type))
    }
}
