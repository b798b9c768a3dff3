// src/services/location_service.rs

use std::{collections::HashMap, sync::Arc};

use uuid::Uuid;

use crate::{
    common::{error::AppError, i18n::I18nStore},
    db::LocationStore,
    models::{
        locations::{LocationUpsert, PositionErrorReason, ShareLocationPayload, UserLocation},
        ride_requests::RenderedNotice,
        rides::RideStatus,
        tenancy::TenantScope,
    },
    services::{
        realtime::{RealtimeHub, RideEvent},
        ride_service::RideService,
    },
};

#[derive(Clone)]
pub struct LocationService {
    rides: RideService,
    locations: Arc<dyn LocationStore>,
    hub: Arc<RealtimeHub>,
}

impl LocationService {
    pub fn new(rides: RideService, locations: Arc<dyn LocationStore>, hub: Arc<RealtimeHub>) -> Self {
        Self { rides, locations, hub }
    }

    /// Só durante a viagem e só para quem participa dela.
    /// O tipo (motorista/passageiro) é derivado, nunca vem do cliente.
    pub async fn share_location(
        &self,
        scope: &TenantScope,
        ride_id: i64,
        payload: ShareLocationPayload,
    ) -> Result<UserLocation, AppError> {
        let ride = self.rides.get_ride(scope, ride_id).await?;
        if ride.ride_status != RideStatus::InProgress {
            return Err(AppError::RideNotInProgress);
        }

        let user_type = self
            .rides
            .participant_type(scope, &ride)
            .await?
            .ok_or(AppError::NotRideParticipant)?;

        let location = self
            .locations
            .upsert_location(
                scope,
                LocationUpsert {
                    ride_id,
                    user_id: scope.user_id,
                    user_type,
                    latitude: payload.latitude,
                    longitude: payload.longitude,
                },
            )
            .await?;

        self.hub.publish(ride_id, RideEvent::LocationUpdated(location.clone()));
        Ok(location)
    }

    pub async fn list_locations(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<UserLocation>, AppError> {
        self.rides.get_ride(scope, ride_id).await?;
        self.locations.list_locations(scope, ride_id).await
    }
}

// ---
// Estado do mapa ao vivo de um assinante
// ---

/// Marcadores por usuário (a posição mais recente vence) e se o próprio
/// aparelho ainda está enviando posição.
#[derive(Debug, Clone)]
pub struct LiveLocationView {
    own_user_id: Uuid,
    markers: HashMap<Uuid, UserLocation>,
    tracking: bool,
}

impl LiveLocationView {
    pub fn new(own_user_id: Uuid, snapshot: Vec<UserLocation>) -> Self {
        let mut view = Self { own_user_id, markers: HashMap::new(), tracking: true };
        for location in snapshot {
            view.apply(location);
        }
        view
    }

    /// Ignora posições mais antigas que a já conhecida.
    pub fn apply(&mut self, location: UserLocation) {
        match self.markers.get(&location.user_id) {
            Some(current) if current.updated_at > location.updated_at => {}
            _ => {
                self.markers.insert(location.user_id, location);
            }
        }
    }

    /// Falha ao ler a posição do próprio aparelho: desliga o rastreamento,
    /// some com o próprio marcador e devolve o aviso. Nunca encerra a sessão.
    pub fn position_failed(&mut self, reason: PositionErrorReason, lang: &str, i18n: &I18nStore) -> RenderedNotice {
        self.tracking = false;
        self.markers.remove(&self.own_user_id);

        tracing::warn!("Rastreamento desligado para {}: {:?}", self.own_user_id, reason);
        RenderedNotice {
            title: i18n.translate(lang, "notice_location_failed", &[]),
            description: i18n.translate(lang, reason.notice_key(), &[]),
        }
    }

    pub fn resume_tracking(&mut self) {
        self.tracking = true;
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Ordenados por usuário para a saída ser estável.
    pub fn markers(&self) -> Vec<&UserLocation> {
        let mut markers: Vec<&UserLocation> = self.markers.values().collect();
        markers.sort_by_key(|l| l.user_id);
        markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            locations::UserType,
            ride_requests::{Decision, RequestSeatPayload},
        },
        services::{ride_request_service::RideRequestService, ride_service::tests::payload},
        test_support::{i18n, MemoryStore},
    };
    use chrono::{Duration, Utc};

    struct World {
        store: Arc<MemoryStore>,
        rides: RideService,
        requests: RideRequestService,
        locations: LocationService,
        driver: TenantScope,
    }

    fn world() -> World {
        let store = MemoryStore::new();
        let hub = RealtimeHub::new();
        let rides = RideService::new(store.clone(), store.clone(), hub.clone());
        World {
            requests: RideRequestService::new(rides.clone(), store.clone(), hub.clone(), i18n()),
            locations: LocationService::new(rides.clone(), store.clone(), hub),
            driver: TenantScope::new(store.seed_tenant("ACME").id, Uuid::new_v4()),
            rides,
            store,
        }
    }

    fn at(lat: f64, lng: f64) -> ShareLocationPayload {
        ShareLocationPayload { latitude: lat, longitude: lng }
    }

    #[tokio::test]
    async fn sharing_twice_keeps_a_single_row() {
        let w = world();
        let ride = w.rides.create_ride(&w.driver, None, payload("A", "B", 2)).await.unwrap();
        w.rides.start_ride(&w.driver, ride.id).await.unwrap();

        w.locations.share_location(&w.driver, ride.id, at(-23.55, -46.63)).await.unwrap();
        let latest = w.locations.share_location(&w.driver, ride.id, at(-23.56, -46.65)).await.unwrap();

        assert_eq!(w.store.location_rows(), 1);
        assert_eq!(latest.user_type, UserType::Driver);
        let listed = w.locations.list_locations(&w.driver, ride.id).await.unwrap();
        assert_eq!(listed, vec![latest]);
    }

    #[tokio::test]
    async fn sharing_requires_a_ride_in_progress() {
        let w = world();
        let ride = w.rides.create_ride(&w.driver, None, payload("A", "B", 2)).await.unwrap();

        let err = w.locations.share_location(&w.driver, ride.id, at(0.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, AppError::RideNotInProgress));
    }

    #[tokio::test]
    async fn accepted_riders_share_as_riders_and_strangers_cannot() {
        let w = world();
        let rider = TenantScope::new(w.driver.tenant_id, Uuid::new_v4());
        let stranger = TenantScope::new(w.driver.tenant_id, Uuid::new_v4());
        let ride = w.rides.create_ride(&w.driver, None, payload("A", "B", 2)).await.unwrap();

        let seat: RequestSeatPayload = serde_json::from_str("{}").unwrap();
        let request = w.requests.request_seat(&rider, None, ride.id, seat).await.unwrap();
        w.requests.decide_request(&w.driver, "en", request.id, Decision::Accepted).await.unwrap();
        w.rides.start_ride(&w.driver, ride.id).await.unwrap();

        let shared = w.locations.share_location(&rider, ride.id, at(1.0, 1.0)).await.unwrap();
        assert_eq!(shared.user_type, UserType::Rider);

        let err = w.locations.share_location(&stranger, ride.id, at(1.0, 1.0)).await.unwrap_err();
        assert!(matches!(err, AppError::NotRideParticipant));
    }

    fn location(user_id: Uuid, minutes: i64, lat: f64) -> UserLocation {
        UserLocation {
            tenant_id: Uuid::nil(),
            ride_id: 1,
            user_id,
            user_type: UserType::Rider,
            latitude: lat,
            longitude: 0.0,
            updated_at: Utc::now() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn view_keeps_the_latest_position_per_user() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut view = LiveLocationView::new(me, vec![location(other, 0, 1.0)]);

        view.apply(location(other, 2, 2.0));
        view.apply(location(other, 1, 9.0)); // chegou atrasada

        let markers = view.markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].latitude, 2.0);
    }

    #[test]
    fn permission_denied_turns_tracking_off_with_a_notice() {
        let me = Uuid::new_v4();
        let mut view = LiveLocationView::new(me, vec![location(me, 0, 1.0)]);
        let store = i18n();

        let notice = view.position_failed(PositionErrorReason::PermissionDenied, "en", &store);

        assert!(!view.is_tracking());
        assert!(view.markers().is_empty());
        assert_eq!(notice.title, "Failed to get location");
        assert_eq!(notice.description, "Location permission was denied. Live tracking is off.");
    }

    #[test]
    fn other_markers_survive_a_local_failure() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut view = LiveLocationView::new(me, vec![location(other, 0, 1.0)]);

        view.position_failed(PositionErrorReason::Timeout, "en", &i18n());
        view.apply(location(other, 1, 3.0));

        assert_eq!(view.markers().len(), 1);
        view.resume_tracking();
        assert!(view.is_tracking());
    }
}
