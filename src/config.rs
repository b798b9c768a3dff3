// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        ClassifiedRepository, LocationRepository, MessageRepository, RideRepository, RideRequestRepository,
        TenantRepository, UserRepository,
    },
    services::{
        auth::AuthService,
        chat_service::ChatService,
        classified_service::ClassifiedService,
        location_service::LocationService,
        realtime::RealtimeHub,
        ride_request_service::RideRequestService,
        ride_service::RideService,
        storage::LocalObjectStorage,
        tenancy_service::TenantService,
    },
};

// Tudo que vem do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub database_max_connections: u32,
    pub upload_dir: String,
    pub public_base_url: String,
    pub jwt_ttl_days: i64,
    pub bcrypt_cost: u32,
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{} deve ser definida", name))
}

fn or_default<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("{} inválida: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            database_max_connections: or_default("DATABASE_MAX_CONNECTIONS", 5)?,
            upload_dir: or_default("UPLOAD_DIR", "./uploads".to_string())?,
            public_base_url: or_default("PUBLIC_BASE_URL", "http://localhost:3000".to_string())?,
            jwt_ttl_days: or_default("JWT_TTL_DAYS", 7)?,
            bcrypt_cost: or_default("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: Arc<I18nStore>,
    pub hub: Arc<RealtimeHub>,
    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub ride_service: RideService,
    pub ride_request_service: RideRequestService,
    pub location_service: LocationService,
    pub chat_service: ChatService,
    pub classified_service: ClassifiedService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let i18n_store = Arc::new(I18nStore::embedded()?);
        let hub = RealtimeHub::new();

        // --- Monta o gráfico de dependências ---
        let user_repo = Arc::new(UserRepository::new(db_pool.clone()));
        let tenant_repo = Arc::new(TenantRepository::new(db_pool.clone()));
        let ride_repo = Arc::new(RideRepository::new(db_pool.clone()));
        let request_repo = Arc::new(RideRequestRepository::new(db_pool.clone()));
        let location_repo = Arc::new(LocationRepository::new(db_pool.clone()));
        let message_repo = Arc::new(MessageRepository::new(db_pool.clone()));
        let classified_repo = Arc::new(ClassifiedRepository::new(db_pool.clone()));
        let storage = Arc::new(LocalObjectStorage::new(&config.upload_dir, &config.public_base_url));

        let tenant_service = TenantService::new(tenant_repo);
        let auth_service = AuthService::new(
            user_repo,
            tenant_service.clone(),
            config.jwt_secret.clone(),
            config.jwt_ttl_days,
            config.bcrypt_cost,
        );
        let ride_service = RideService::new(ride_repo, request_repo.clone(), hub.clone());
        let ride_request_service =
            RideRequestService::new(ride_service.clone(), request_repo, hub.clone(), i18n_store.clone());
        let location_service = LocationService::new(ride_service.clone(), location_repo, hub.clone());
        let chat_service = ChatService::new(ride_service.clone(), message_repo, hub.clone());
        let classified_service = ClassifiedService::new(classified_repo, storage);

        Ok(Self {
            db_pool,
            i18n_store,
            hub,
            auth_service,
            tenant_service,
            ride_service,
            ride_request_service,
            location_service,
            chat_service,
            classified_service,
        })
    }
}
