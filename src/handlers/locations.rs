// src/handlers/locations.rs

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::locations::{ShareLocationPayload, UserLocation},
};

#[utoipa::path(
    get,
    path = "/api/rides/{id}/locations",
    tag = "Live Location",
    params(("id" = i64, Path, description = "ID da carona")),
    responses(
        (status = 200, description = "Última posição de cada participante", body = Vec<UserLocation>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_locations(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(ride_id): Path<i64>,
) -> Result<Json<Vec<UserLocation>>, ApiError> {
    let locations = app_state
        .location_service
        .list_locations(&ctx.scope(), ride_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(locations))
}

#[utoipa::path(
    post,
    path = "/api/rides/{id}/locations",
    tag = "Live Location",
    params(("id" = i64, Path, description = "ID da carona")),
    request_body = ShareLocationPayload,
    responses(
        (status = 200, description = "Posição gravada", body = UserLocation),
        (status = 403, description = "Não participa da carona"),
        (status = 409, description = "Carona não está em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn share_location(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(ride_id): Path<i64>,
    Json(payload): Json<ShareLocationPayload>,
) -> Result<Json<UserLocation>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let location = app_state
        .location_service
        .share_location(&ctx.scope(), ride_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(location))
}
