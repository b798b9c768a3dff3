// src/handlers/tenancy.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::tenancy::{Profile, ResolvedTenant, Tenant, UpdateProfilePayload},
};

// ---
// 1. "Payload" (O "Formulário" da API)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTenantPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "ACME Ltda")]
    pub name: String,
}

// ---
// 2. Os "Handlers" (As Rotas)
// ---

// Público: a organização precisa existir antes do primeiro registro
#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Tenancy",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Organização criada", body = Tenant),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidField { field: "name", key: "required" }
            .to_api_error(&locale, &app_state.i18n_store));
    }

    let tenant = app_state
        .tenant_service
        .create_tenant(&payload.name)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

// O resultado do resolvedor (já calculado pelo tenant_guard)
#[utoipa::path(
    get,
    path = "/api/tenants/current",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Organização e perfil do usuário logado", body = ResolvedTenant),
        (status = 403, description = "Organização não resolvida")
    ),
    security(("api_jwt" = []))
)]
pub async fn current_tenant(ctx: TenantContext) -> Json<ResolvedTenant> {
    Json(ResolvedTenant { tenant: ctx.tenant, profile: ctx.profile })
}

#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Perfil do usuário logado", body = Profile)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_profile(ctx: TenantContext) -> Json<Profile> {
    Json(ctx.profile)
}

#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "Profile",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Perfil atualizado", body = Profile),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<Profile>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let profile = app_state
        .tenant_service
        .update_profile(&ctx.user, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(profile))
}
