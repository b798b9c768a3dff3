// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::{ride_requests::RequestStatus, rides::RideStatus},
};

// O erro de domínio. Repositórios e serviços devolvem sempre este tipo;
// só os handlers o convertem em ApiError (com a mensagem traduzida).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Validações que não cabem no derive (ex: recorrência, coordenadas)
    #[error("Campo inválido: {field}")]
    InvalidField { field: &'static str, key: &'static str },

    // --- Autenticação ---
    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    // --- Tenancy ---
    #[error("Organização não encontrada")]
    TenantNotFound,

    #[error("Não foi possível resolver a organização do usuário")]
    TenantNotResolved,

    // --- Não encontrados ---
    #[error("Carona {0} não encontrada")]
    RideNotFound(i64),

    #[error("Pedido {0} não encontrado")]
    RequestNotFound(i64),

    #[error("Classificado {0} não encontrado")]
    ClassifiedNotFound(i64),

    // --- Autorização / posse ---
    #[error("Apenas o motorista pode realizar esta ação")]
    NotRideDriver,

    #[error("Usuário não participa desta carona")]
    NotRideParticipant,

    #[error("Apenas o dono do classificado pode alterá-lo")]
    NotClassifiedOwner,

    // --- Conflitos de estado ---
    #[error("Transição inválida: {from:?} -> {to:?}")]
    InvalidRideTransition { from: RideStatus, to: RideStatus },

    #[error("Pedido já decidido ({0:?})")]
    RequestAlreadyDecided(RequestStatus),

    #[error("Assentos insuficientes: pedidos {requested}, disponíveis {available}")]
    InsufficientSeats { requested: i32, available: i32 },

    #[error("O motorista não pode pedir lugar na própria carona")]
    CannotRequestOwnRide,

    #[error("A carona não aceita mais pedidos")]
    RideNotOpen,

    #[error("A carona não está em andamento")]
    RideNotInProgress,

    #[error("Mensagem vazia")]
    EmptyMessage,

    // --- Upload ---
    #[error("Tipo de arquivo não suportado: {0}")]
    UnsupportedMediaType(String),

    #[error("Arquivo excede o limite de {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Erro no armazenamento de arquivos: {0}")]
    StorageError(#[from] std::io::Error),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O erro "de fronteira": já tem status HTTP e mensagem traduzida.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } | AppError::EmptyMessage => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::TenantNotResolved
            | AppError::NotRideDriver
            | AppError::NotRideParticipant
            | AppError::NotClassifiedOwner => StatusCode::FORBIDDEN,
            AppError::UserNotFound
            | AppError::TenantNotFound
            | AppError::RideNotFound(_)
            | AppError::RequestNotFound(_)
            | AppError::ClassifiedNotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists
            | AppError::InvalidRideTransition { .. }
            | AppError::RequestAlreadyDecided(_)
            | AppError::InsufficientSeats { .. }
            | AppError::CannotRequestOwnRide
            | AppError::RideNotOpen
            | AppError::RideNotInProgress => StatusCode::CONFLICT,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::StorageError(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Chave usada para buscar a mensagem no I18nStore
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::InvalidField { key, .. } => *key,
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::UserNotFound => "user_not_found",
            AppError::TenantNotFound => "tenant_not_found",
            AppError::TenantNotResolved => "tenant_not_resolved",
            AppError::RideNotFound(_) => "ride_not_found",
            AppError::RequestNotFound(_) => "request_not_found",
            AppError::ClassifiedNotFound(_) => "classified_not_found",
            AppError::NotRideDriver => "not_ride_driver",
            AppError::NotRideParticipant => "not_ride_participant",
            AppError::NotClassifiedOwner => "not_classified_owner",
            AppError::InvalidRideTransition { .. } => "invalid_ride_transition",
            AppError::RequestAlreadyDecided(_) => "request_already_decided",
            AppError::InsufficientSeats { .. } => "insufficient_seats",
            AppError::CannotRequestOwnRide => "cannot_request_own_ride",
            AppError::RideNotOpen => "ride_not_open",
            AppError::RideNotInProgress => "ride_not_in_progress",
            AppError::EmptyMessage => "empty_message",
            AppError::UnsupportedMediaType(_) => "unsupported_media_type",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::StorageError(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "internal_error",
        }
    }

    fn message_params(&self) -> Vec<(&'static str, String)> {
        match self {
            AppError::InvalidField { field, .. } => vec![("field", field.to_string())],
            AppError::RideNotFound(id) | AppError::RequestNotFound(id) | AppError::ClassifiedNotFound(id) => {
                vec![("id", id.to_string())]
            }
            AppError::InsufficientSeats { requested, available } => vec![
                ("requested", requested.to_string()),
                ("available", available.to_string()),
            ],
            AppError::RequestAlreadyDecided(status) => vec![("status", status.as_str().to_string())],
            AppError::UnsupportedMediaType(content_type) => vec![("contentType", content_type.clone())],
            AppError::PayloadTooLarge(limit) => vec![("limit", limit.to_string())],
            _ => Vec::new(),
        }
    }

    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O detalhe fica só no log; o cliente recebe a mensagem genérica.
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let params = self.message_params();
        let params_ref: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let error = store.translate(&locale.0, self.message_key(), &params_ref);

        let details = match self {
            AppError::ValidationError(errors) => Some(validation_details(errors, locale, store)),
            AppError::InvalidField { field, key } => {
                let mut map = serde_json::Map::new();
                map.insert(
                    field.to_string(),
                    json!([store.translate(&locale.0, key, &[("field", *field)])]),
                );
                Some(Value::Object(map))
            }
            _ => None,
        };

        ApiError { status, error, details }
    }
}

// Retorna todos os detalhes da validação, campo a campo.
// As mensagens do `validator` são chaves do I18nStore.
fn validation_details(errors: &validator::ValidationErrors, locale: &Locale, store: &I18nStore) -> Value {
    let mut details = serde_json::Map::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<Value> = field_errors
            .iter()
            .map(|e| {
                let key = e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string());
                Value::String(store.translate(&locale.0, &key, &[("field", field.as_ref())]))
            })
            .collect();
        details.insert(field.to_string(), Value::Array(messages));
    }
    Value::Object(details)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "required"))]
        title: String,
    }

    fn store() -> I18nStore {
        I18nStore::embedded().expect("locales embutidos válidos")
    }

    #[rstest]
    #[case(AppError::InvalidToken, StatusCode::UNAUTHORIZED)]
    #[case(AppError::NotRideDriver, StatusCode::FORBIDDEN)]
    #[case(AppError::RideNotFound(7), StatusCode::NOT_FOUND)]
    #[case(AppError::RequestAlreadyDecided(RequestStatus::Accepted), StatusCode::CONFLICT)]
    #[case(AppError::InsufficientSeats { requested: 2, available: 1 }, StatusCode::CONFLICT)]
    #[case(AppError::EmptyMessage, StatusCode::BAD_REQUEST)]
    #[case(AppError::DatabaseError(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_errors_to_http_status(#[case] error: AppError, #[case] expected: StatusCode) {
        assert_eq!(error.status_code(), expected);
    }

    #[test]
    fn internal_errors_hide_the_cause() {
        let api = AppError::DatabaseError(sqlx::Error::PoolTimedOut)
            .to_api_error(&Locale("en".into()), &store());

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("pool"));
        assert!(api.details.is_none());
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let errors = Payload { title: String::new() }.validate().unwrap_err();
        let api = AppError::ValidationError(errors).to_api_error(&Locale("en".into()), &store());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("detalhes por campo");
        assert_eq!(details["title"][0], "title is required.");
    }

    #[test]
    fn messages_follow_the_locale() {
        let error = AppError::RideNotFound(42);
        let en = error.to_api_error(&Locale("en".into()), &store());
        let pt = error.to_api_error(&Locale("pt".into()), &store());

        assert_eq!(en.error, "Ride 42 not found.");
        assert_eq!(pt.error, "Carona 42 não encontrada.");
    }
}
