// src/handlers/ride_requests.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::ride_requests::{DecideRequestPayload, DecisionOutcome, RequestSeatPayload, RideRequest},
};

#[utoipa::path(
    get,
    path = "/api/rides/{id}/requests",
    tag = "Ride Requests",
    params(("id" = i64, Path, description = "ID da carona")),
    responses(
        (status = 200, description = "Pedidos da carona (mais antigos primeiro)", body = Vec<RideRequest>),
        (status = 404, description = "Carona não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(ride_id): Path<i64>,
) -> Result<Json<Vec<RideRequest>>, ApiError> {
    let requests = app_state
        .ride_request_service
        .list_requests(&ctx.scope(), ride_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(requests))
}

#[utoipa::path(
    post,
    path = "/api/rides/{id}/requests",
    tag = "Ride Requests",
    params(("id" = i64, Path, description = "ID da carona")),
    request_body = RequestSeatPayload,
    responses(
        (status = 201, description = "Pedido criado (pending)", body = RideRequest),
        (status = 409, description = "Carona própria ou já iniciada")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_seat(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(ride_id): Path<i64>,
    Json(payload): Json<RequestSeatPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .ride_request_service
        .request_seat(&ctx.scope(), ctx.display_name(), ride_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(request)))
}

// A resposta traz o aviso já traduzido para quem decidiu
#[utoipa::path(
    post,
    path = "/api/requests/{id}/decision",
    tag = "Ride Requests",
    params(("id" = i64, Path, description = "ID do pedido")),
    request_body = DecideRequestPayload,
    responses(
        (status = 200, description = "Pedido decidido", body = DecisionOutcome),
        (status = 403, description = "Apenas o motorista"),
        (status = 409, description = "Já decidido ou sem assentos")
    ),
    security(("api_jwt" = []))
)]
pub async fn decide_request(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(request_id): Path<i64>,
    Json(payload): Json<DecideRequestPayload>,
) -> Result<Json<DecisionOutcome>, ApiError> {
    let outcome = app_state
        .ride_request_service
        .decide_request(&ctx.scope(), &locale.0, request_id, payload.decision)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(outcome))
}
