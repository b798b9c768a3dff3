//src/main.rs

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;
#[cfg(test)]
mod test_support;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG sobrescreve o filtro padrão
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env().context("Falha ao carregar a configuração")?;
    let bind_addr = config.bind_addr.clone();
    let upload_dir = config.upload_dir.clone();

    let app_state = AppState::new(config)
        .await
        .context("Falha ao inicializar o estado da aplicação")?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas públicas
    let public_routes = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/tenants", post(handlers::tenancy::create_tenant));

    // Só precisam do token
    let user_routes = Router::new()
        .route("/api/users/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Token + organização resolvida
    let tenant_routes = Router::new()
        .route("/api/tenants/current", get(handlers::tenancy::current_tenant))
        .route(
            "/api/profile",
            get(handlers::tenancy::get_profile).put(handlers::tenancy::update_profile),
        )
        .route(
            "/api/rides",
            get(handlers::rides::list_rides).post(handlers::rides::create_ride),
        )
        .route("/api/rides/{id}", get(handlers::rides::get_ride))
        .route("/api/rides/{id}/start", post(handlers::rides::start_ride))
        .route(
            "/api/rides/{id}/requests",
            get(handlers::ride_requests::list_requests).post(handlers::ride_requests::request_seat),
        )
        .route("/api/requests/{id}/decision", post(handlers::ride_requests::decide_request))
        .route(
            "/api/rides/{id}/locations",
            get(handlers::locations::list_locations).post(handlers::locations::share_location),
        )
        .route(
            "/api/rides/{id}/messages",
            get(handlers::chat::list_messages).post(handlers::chat::send_message),
        )
        .route("/api/rides/{id}/feed", get(handlers::realtime::ride_feed))
        .route(
            "/api/classifieds",
            get(handlers::classifieds::list_classifieds).post(handlers::classifieds::create_classified),
        )
        .route("/api/classifieds/facets", get(handlers::classifieds::get_facets))
        .route(
            "/api/classifieds/images",
            post(handlers::classifieds::upload_image)
                .layer(DefaultBodyLimit::max(handlers::classifieds::UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/api/classifieds/{id}",
            get(handlers::classifieds::get_classified)
                .put(handlers::classifieds::update_classified)
                .delete(handlers::classifieds::delete_classified),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(tenant_routes)
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
