// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const ANONYMOUS_NAME: &str = "Anonymous";

// Representa a conta de identidade vinda do banco de dados.
// `full_name` e `tenant_id` fazem o papel dos metadados do usuário.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "ana@empresa.com")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    #[schema(example = "Ana Souza")]
    pub full_name: Option<String>,
    pub tenant_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn display_name_or_anonymous(name: Option<&str>) -> &str {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n,
        _ => ANONYMOUS_NAME,
    }
}

// O que o repositório precisa para inserir uma conta
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub tenant_id: Uuid,
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "ana@empresa.com")]
    pub email: String,

    #[validate(length(min = 6, message = "password_too_short"))]
    #[schema(example = "segredo123")]
    pub password: String,

    #[schema(example = "Ana Souza")]
    pub full_name: Option<String>,

    // A organização (tenant) à qual o funcionário pertence
    pub tenant_id: Uuid,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "ana@empresa.com")]
    pub email: String,
    #[validate(length(min = 6, message = "password_too_short"))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}
