// src/test_support.rs
// Armazenamento em memória que imita as queries do Postgres (filtro por
// tenant_id, ordenação, upsert e decisão condicional) para os testes de serviço,
// e o pool de Postgres real usado pelos testes de repositório (db/pg_tests.rs).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    common::{error::AppError, i18n::I18nStore},
    db::{ClassifiedStore, LocationStore, MessageStore, RideRequestStore, RideStore, TenantStore, UserStore},
    models::{
        auth::{NewUser, User},
        chat::{Message, NewMessage},
        classifieds::{Classified, ClassifiedPayload, ClassifiedStatus},
        locations::{LocationUpsert, UserLocation},
        ride_requests::{Decision, NewRideRequest, RequestStatus, RideRequest},
        rides::{ListRidesQuery, NewRide, Ride, RideSort, RideStatus},
        tenancy::{NewProfile, Profile, Tenant, TenantScope, UpdateProfilePayload},
    },
};

#[derive(Default)]
struct State {
    users: Vec<User>,
    tenants: Vec<Tenant>,
    profiles: Vec<Profile>,
    rides: Vec<Ride>,
    requests: Vec<RideRequest>,
    messages: Vec<Message>,
    locations: Vec<UserLocation>,
    classifieds: Vec<Classified>,
    next_id: i64,
    tick: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    // Relógio estritamente crescente: cada escrita acontece "depois" da anterior
    fn now(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        DateTime::parse_from_rfc3339("2025-01-01T08:00:00Z")
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_default()
            + Duration::seconds(self.tick)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_tenant(&self, name: &str) -> Tenant {
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        let tenant = Tenant { id: Uuid::new_v4(), name: name.into(), created_at: now, updated_at: now };
        state.tenants.push(tenant.clone());
        tenant
    }

    pub fn seed_user(&self, tenant_id: Uuid, full_name: Option<&str>) -> User {
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        let id = Uuid::new_v4();
        let user = User {
            id,
            email: format!("{}@empresa.com", id.simple()),
            password_hash: String::new(),
            full_name: full_name.map(str::to_string),
            tenant_id,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        user
    }

    pub fn location_rows(&self) -> usize {
        self.state.lock().unwrap().locations.len()
    }

    pub fn ride_snapshot(&self, ride_id: i64) -> Option<Ride> {
        self.state.lock().unwrap().rides.iter().find(|r| r.id == ride_id).cloned()
    }
}

pub fn i18n() -> Arc<I18nStore> {
    Arc::new(I18nStore::embedded().expect("locales embutidos válidos"))
}

// ---
// Postgres de verdade para os testes de repositório
// ---
// TEST_DATABASE_URL aponta para um banco descartável. Sem ela o teste é
// pulado; com ela, falha de conexão ou de migração derruba o teste, a não ser
// que SKIP_TEST_DB=1.

fn should_skip_test_db() -> bool {
    std::env::var("SKIP_TEST_DB").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn handle_db_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_db() {
        eprintln!("SKIP-TEST-DB: {reason}");
        None
    } else {
        panic!("Falha ao preparar o banco de teste: {reason}. Use SKIP_TEST_DB=1 para pular.");
    }
}

/// Pool migrado, ou `None` quando o teste deve ser pulado.
pub async fn pg_pool(max_connections: u32) -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("SKIP-TEST-DB: TEST_DATABASE_URL não definida");
        return None;
    };

    let pool = match PgPoolOptions::new().max_connections(max_connections).connect(&url).await {
        Ok(pool) => pool,
        Err(e) => return handle_db_setup_failure(e),
    };

    // O migrator segura um advisory lock: testes em paralelo não se atropelam
    if let Err(e) = sqlx::migrate!().run(&pool).await {
        return handle_db_setup_failure(e);
    }
    Some(pool)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&new_user.email)) {
            return Err(AppError::EmailAlreadyExists);
        }
        if !state.tenants.iter().any(|t| t.id == new_user.tenant_id) {
            return Err(AppError::TenantNotFound);
        }
        let now = state.now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            full_name: new_user.full_name,
            tenant_id: new_user.tenant_id,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn create_tenant(&self, name: &str) -> Result<Tenant, AppError> {
        Ok(self.seed_tenant(name))
    }

    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.tenants.iter().find(|t| t.id == id).cloned())
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn create_profile(&self, new_profile: NewProfile) -> Result<Profile, AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.profiles.iter().find(|p| p.id == new_profile.id) {
            return Ok(existing.clone());
        }
        let now = state.now();
        let profile = Profile {
            id: new_profile.id,
            tenant_id: new_profile.tenant_id,
            email: new_profile.email,
            full_name: new_profile.full_name,
            avatar_url: None,
            home_location: None,
            home_latitude: None,
            home_longitude: None,
            office_location: None,
            office_latitude: None,
            office_longitude: None,
            created_at: now,
            updated_at: now,
        };
        state.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        payload: UpdateProfilePayload,
    ) -> Result<Option<Profile>, AppError> {
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        let Some(profile) = state.profiles.iter_mut().find(|p| p.id == user_id) else {
            return Ok(None);
        };
        profile.full_name = payload.full_name;
        profile.avatar_url = payload.avatar_url;
        profile.home_location = payload.home_location;
        profile.home_latitude = payload.home_latitude;
        profile.home_longitude = payload.home_longitude;
        profile.office_location = payload.office_location;
        profile.office_latitude = payload.office_latitude;
        profile.office_longitude = payload.office_longitude;
        profile.updated_at = now;
        Ok(Some(profile.clone()))
    }
}

#[async_trait]
impl RideStore for MemoryStore {
    async fn insert_ride(&self, scope: &TenantScope, new_ride: NewRide) -> Result<Ride, AppError> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let now = state.now();
        let ride = Ride {
            id,
            tenant_id: scope.tenant_id,
            driver_id: new_ride.driver_id,
            driver_name: new_ride.driver_name,
            from_location: new_ride.from_location,
            to_location: new_ride.to_location,
            from_latitude: new_ride.from_point.map(|p| p.latitude),
            from_longitude: new_ride.from_point.map(|p| p.longitude),
            to_latitude: new_ride.to_point.map(|p| p.latitude),
            to_longitude: new_ride.to_point.map(|p| p.longitude),
            distance: new_ride.distance,
            departure_date: new_ride.departure_date,
            departure_time: new_ride.departure_time,
            seats_available: new_ride.seats_available,
            ride_status: RideStatus::Pending,
            is_recurring: new_ride.recurrence.is_recurring,
            recurring_days: new_ride.recurrence.days,
            recurring_until: new_ride.recurrence.until,
            created_at: now,
            updated_at: now,
        };
        state.rides.push(ride.clone());
        Ok(ride)
    }

    async fn list_rides(&self, scope: &TenantScope, query: ListRidesQuery) -> Result<Vec<Ride>, AppError> {
        let state = self.state.lock().unwrap();
        let mut rides: Vec<Ride> = state
            .rides
            .iter()
            .filter(|r| r.tenant_id == scope.tenant_id)
            .filter(|r| query.status.is_none_or(|s| r.ride_status == s))
            .cloned()
            .collect();
        match query.sort.unwrap_or_default() {
            RideSort::Newest => rides.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))),
            RideSort::Oldest => rides.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))),
        }
        Ok(rides)
    }

    async fn find_ride(&self, scope: &TenantScope, ride_id: i64) -> Result<Option<Ride>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.rides.iter().find(|r| r.id == ride_id && r.tenant_id == scope.tenant_id).cloned())
    }

    async fn transition_status(
        &self,
        scope: &TenantScope,
        ride_id: i64,
        from: RideStatus,
        to: RideStatus,
    ) -> Result<Option<Ride>, AppError> {
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        let ride = state
            .rides
            .iter_mut()
            .find(|r| r.id == ride_id && r.tenant_id == scope.tenant_id && r.ride_status == from);
        Ok(ride.map(|r| {
            r.ride_status = to;
            r.updated_at = now;
            r.clone()
        }))
    }
}

#[async_trait]
impl RideRequestStore for MemoryStore {
    async fn insert_request(
        &self,
        scope: &TenantScope,
        new_request: NewRideRequest,
    ) -> Result<RideRequest, AppError> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let now = state.now();
        let request = RideRequest {
            id,
            tenant_id: scope.tenant_id,
            ride_id: new_request.ride_id,
            requester_id: new_request.requester_id,
            requester_name: new_request.requester_name,
            seats_requested: new_request.seats_requested,
            status: RequestStatus::Pending,
            is_recurring: new_request.recurrence.is_recurring,
            recurring_days: new_request.recurrence.days,
            recurring_until: new_request.recurrence.until,
            created_at: now,
            updated_at: now,
        };
        state.requests.push(request.clone());
        Ok(request)
    }

    async fn list_for_ride(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<RideRequest>, AppError> {
        let state = self.state.lock().unwrap();
        let mut requests: Vec<RideRequest> = state
            .requests
            .iter()
            .filter(|r| r.ride_id == ride_id && r.tenant_id == scope.tenant_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(requests)
    }

    async fn find_request(&self, scope: &TenantScope, request_id: i64) -> Result<Option<RideRequest>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .requests
            .iter()
            .find(|r| r.id == request_id && r.tenant_id == scope.tenant_id)
            .cloned())
    }

    async fn decide(
        &self,
        scope: &TenantScope,
        request_id: i64,
        decision: Decision,
    ) -> Result<RideRequest, AppError> {
        let mut state = self.state.lock().unwrap();
        let now = state.now();

        let index = state
            .requests
            .iter()
            .position(|r| r.id == request_id && r.tenant_id == scope.tenant_id)
            .ok_or(AppError::RequestNotFound(request_id))?;
        let current = state.requests[index].clone();
        if current.status.is_terminal() {
            return Err(AppError::RequestAlreadyDecided(current.status));
        }

        if decision == Decision::Accepted {
            let ride = state
                .rides
                .iter_mut()
                .find(|r| r.id == current.ride_id && r.tenant_id == scope.tenant_id);
            match ride {
                Some(ride) if ride.seats_available >= current.seats_requested => {
                    ride.seats_available -= current.seats_requested;
                    ride.updated_at = now;
                }
                other => {
                    return Err(AppError::InsufficientSeats {
                        requested: current.seats_requested,
                        available: other.map(|r| r.seats_available).unwrap_or(0),
                    });
                }
            }
        }

        let request = &mut state.requests[index];
        request.status = decision.status();
        request.updated_at = now;
        Ok(request.clone())
    }

    async fn has_accepted_request(
        &self,
        scope: &TenantScope,
        ride_id: i64,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.requests.iter().any(|r| {
            r.ride_id == ride_id
                && r.tenant_id == scope.tenant_id
                && r.requester_id == user_id
                && r.status == RequestStatus::Accepted
        }))
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn upsert_location(&self, scope: &TenantScope, upsert: LocationUpsert) -> Result<UserLocation, AppError> {
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        let row = UserLocation {
            tenant_id: scope.tenant_id,
            ride_id: upsert.ride_id,
            user_id: upsert.user_id,
            user_type: upsert.user_type,
            latitude: upsert.latitude,
            longitude: upsert.longitude,
            updated_at: now,
        };
        match state
            .locations
            .iter_mut()
            .find(|l| l.user_id == upsert.user_id && l.ride_id == upsert.ride_id)
        {
            Some(existing) => *existing = row.clone(),
            None => state.locations.push(row.clone()),
        }
        Ok(row)
    }

    async fn list_locations(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<UserLocation>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .locations
            .iter()
            .filter(|l| l.ride_id == ride_id && l.tenant_id == scope.tenant_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, scope: &TenantScope, new_message: NewMessage) -> Result<Message, AppError> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let now = state.now();
        let message = Message {
            id,
            tenant_id: scope.tenant_id,
            ride_id: new_message.ride_id,
            sender_id: new_message.sender_id,
            sender_name: new_message.sender_name,
            content: new_message.content,
            created_at: now,
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, scope: &TenantScope, ride_id: i64) -> Result<Vec<Message>, AppError> {
        let state = self.state.lock().unwrap();
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.ride_id == ride_id && m.tenant_id == scope.tenant_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }
}

#[async_trait]
impl ClassifiedStore for MemoryStore {
    async fn insert_classified(&self, scope: &TenantScope, payload: ClassifiedPayload) -> Result<Classified, AppError> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let now = state.now();
        let classified = Classified {
            id,
            tenant_id: scope.tenant_id,
            user_id: scope.user_id,
            title: payload.title,
            description: payload.description,
            price: payload.price,
            category: payload.category,
            location: payload.location,
            contact_info: payload.contact_info,
            image_url: payload.image_url,
            status: ClassifiedStatus::Active,
            created_at: now,
            updated_at: now,
        };
        state.classifieds.push(classified.clone());
        Ok(classified)
    }

    async fn list_classifieds(&self, scope: &TenantScope) -> Result<Vec<Classified>, AppError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<Classified> = state
            .classifieds
            .iter()
            .filter(|c| c.tenant_id == scope.tenant_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn find_classified(&self, scope: &TenantScope, id: i64) -> Result<Option<Classified>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.classifieds.iter().find(|c| c.id == id && c.tenant_id == scope.tenant_id).cloned())
    }

    async fn update_classified(
        &self,
        scope: &TenantScope,
        id: i64,
        payload: ClassifiedPayload,
    ) -> Result<Option<Classified>, AppError> {
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        let Some(row) = state.classifieds.iter_mut().find(|c| c.id == id && c.tenant_id == scope.tenant_id) else {
            return Ok(None);
        };
        row.title = payload.title;
        row.description = payload.description;
        row.price = payload.price;
        row.category = payload.category;
        row.location = payload.location;
        row.contact_info = payload.contact_info;
        row.image_url = payload.image_url;
        if let Some(status) = payload.status {
            row.status = status;
        }
        row.updated_at = now;
        Ok(Some(row.clone()))
    }

    async fn delete_classified(&self, scope: &TenantScope, id: i64) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let before = state.classifieds.len();
        state.classifieds.retain(|c| !(c.id == id && c.tenant_id == scope.tenant_id));
        Ok(state.classifieds.len() < before)
    }
}
