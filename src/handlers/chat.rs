// src/handlers/chat.rs

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
    models::chat::{Message, SendMessagePayload},
};

#[utoipa::path(
    get,
    path = "/api/rides/{id}/messages",
    tag = "Chat",
    params(("id" = i64, Path, description = "ID da carona")),
    responses(
        (status = 200, description = "Mensagens em ordem de envio", body = Vec<Message>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_messages(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(ride_id): Path<i64>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = app_state
        .chat_service
        .list_messages(&ctx.scope(), ride_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(messages))
}

#[utoipa::path(
    post,
    path = "/api/rides/{id}/messages",
    tag = "Chat",
    params(("id" = i64, Path, description = "ID da carona")),
    request_body = SendMessagePayload,
    responses(
        (status = 201, description = "Mensagem enviada", body = Message),
        (status = 400, description = "Mensagem vazia ou longa demais"),
        (status = 403, description = "Não participa da carona")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_message(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(ride_id): Path<i64>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state
        .chat_service
        .send_message(&ctx.scope(), ctx.display_name(), ride_id, &payload.content)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(message)))
}
