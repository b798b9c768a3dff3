// src/handlers/classifieds.rs

use axum::{
    extract::{multipart::Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::classifieds::{
        Classified, ClassifiedPage, ClassifiedPayload, ClassifiedQuery, Facets, ImageUploadResponse,
    },
    services::classified_service::MAX_IMAGE_BYTES,
};

// Margem para os cabeçalhos do multipart
pub const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

#[utoipa::path(
    get,
    path = "/api/classifieds",
    tag = "Classifieds",
    params(ClassifiedQuery),
    responses(
        (status = 200, description = "Página de anúncios filtrada", body = ClassifiedPage)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_classifieds(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Query(query): Query<ClassifiedQuery>,
) -> Result<Json<ClassifiedPage>, ApiError> {
    let page = app_state
        .classified_service
        .list(&ctx.scope(), &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/classifieds/facets",
    tag = "Classifieds",
    responses(
        (status = 200, description = "Categorias e locais distintos (\"all\" primeiro)", body = Facets)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_facets(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
) -> Result<Json<Facets>, ApiError> {
    let facets = app_state
        .classified_service
        .facets(&ctx.scope())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(facets))
}

#[utoipa::path(
    post,
    path = "/api/classifieds",
    tag = "Classifieds",
    request_body = ClassifiedPayload,
    responses(
        (status = 201, description = "Anúncio publicado", body = Classified),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_classified(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Json(payload): Json<ClassifiedPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let classified = app_state
        .classified_service
        .create(&ctx.scope(), payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(classified)))
}

#[utoipa::path(
    get,
    path = "/api/classifieds/{id}",
    tag = "Classifieds",
    params(("id" = i64, Path, description = "ID do anúncio")),
    responses(
        (status = 200, description = "Anúncio", body = Classified),
        (status = 404, description = "Anúncio não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_classified(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<Classified>, ApiError> {
    let classified = app_state
        .classified_service
        .get(&ctx.scope(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(classified))
}

#[utoipa::path(
    put,
    path = "/api/classifieds/{id}",
    tag = "Classifieds",
    params(("id" = i64, Path, description = "ID do anúncio")),
    request_body = ClassifiedPayload,
    responses(
        (status = 200, description = "Anúncio atualizado", body = Classified),
        (status = 403, description = "Apenas o autor")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_classified(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(id): Path<i64>,
    Json(payload): Json<ClassifiedPayload>,
) -> Result<Json<Classified>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let classified = app_state
        .classified_service
        .update(&ctx.scope(), id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(classified))
}

#[utoipa::path(
    delete,
    path = "/api/classifieds/{id}",
    tag = "Classifieds",
    params(("id" = i64, Path, description = "ID do anúncio")),
    responses(
        (status = 204, description = "Anúncio removido"),
        (status = 403, description = "Apenas o autor")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_classified(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    app_state
        .classified_service
        .delete(&ctx.scope(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// multipart/form-data com um campo "file"
#[utoipa::path(
    post,
    path = "/api/classifieds/images",
    tag = "Classifieds",
    request_body(content_type = "multipart/form-data", description = "Campo \"file\" com a imagem"),
    responses(
        (status = 201, description = "Imagem guardada", body = ImageUploadResponse),
        (status = 413, description = "Imagem grande demais"),
        (status = 415, description = "Formato não suportado")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_image(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        let err = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(MAX_IMAGE_BYTES)
        } else {
            tracing::warn!("Multipart inválido: {}", e);
            AppError::InvalidField { field: "file", key: "missing_file" }
        };
        err.to_api_error(&locale, &app_state.i18n_store)
    };

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((content_type, bytes.to_vec()));
        break;
    }

    let (content_type, bytes) = upload.ok_or_else(|| {
        AppError::InvalidField { field: "file", key: "missing_file" }
            .to_api_error(&locale, &app_state.i18n_store)
    })?;

    let response = app_state
        .classified_service
        .upload_image(&ctx.scope(), content_type.as_deref(), bytes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(response)))
}
