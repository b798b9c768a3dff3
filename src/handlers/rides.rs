// src/handlers/rides.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::rides::{CreateRidePayload, ListRidesQuery, Ride},
};

#[utoipa::path(
    get,
    path = "/api/rides",
    tag = "Rides",
    params(ListRidesQuery),
    responses(
        (status = 200, description = "Caronas da organização (mais novas primeiro)", body = Vec<Ride>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_rides(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Query(query): Query<ListRidesQuery>,
) -> Result<Json<Vec<Ride>>, ApiError> {
    let rides = app_state
        .ride_service
        .list_rides(&ctx.scope(), query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(rides))
}

#[utoipa::path(
    post,
    path = "/api/rides",
    tag = "Rides",
    request_body = CreateRidePayload,
    responses(
        (status = 201, description = "Carona publicada", body = Ride),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_ride(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Json(payload): Json<CreateRidePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ride = app_state
        .ride_service
        .create_ride(&ctx.scope(), ctx.display_name(), payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ride)))
}

#[utoipa::path(
    get,
    path = "/api/rides/{id}",
    tag = "Rides",
    params(("id" = i64, Path, description = "ID da carona")),
    responses(
        (status = 200, description = "Carona", body = Ride),
        (status = 404, description = "Carona não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_ride(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(ride_id): Path<i64>,
) -> Result<Json<Ride>, ApiError> {
    let ride = app_state
        .ride_service
        .get_ride(&ctx.scope(), ride_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ride))
}

// pending -> in_progress
#[utoipa::path(
    post,
    path = "/api/rides/{id}/start",
    tag = "Rides",
    params(("id" = i64, Path, description = "ID da carona")),
    responses(
        (status = 200, description = "Carona iniciada", body = Ride),
        (status = 403, description = "Apenas o motorista"),
        (status = 409, description = "A carona já foi iniciada")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_ride(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(ride_id): Path<i64>,
) -> Result<Json<Ride>, ApiError> {
    let ride = app_state
        .ride_service
        .start_ride(&ctx.scope(), ride_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ride))
}
