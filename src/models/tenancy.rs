// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Tenant (A "Organização")
// ---
// A empresa cujos funcionários compartilham caronas
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    #[schema(example = "ACME Ltda")]
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. Profile (O "Perfil" do funcionário)
// ---
// id = id do usuário. Criado sob demanda no primeiro login.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: Option<String>,
    #[schema(example = "Ana Souza")]
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,

    #[schema(example = "Rua das Flores, 123")]
    pub home_location: Option<String>,
    pub home_latitude: Option<f64>,
    pub home_longitude: Option<f64>,

    #[schema(example = "Downtown Office")]
    pub office_location: Option<String>,
    pub office_latitude: Option<f64>,
    pub office_longitude: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

// PUT /api/profile substitui todos os campos editáveis: null limpa o valor.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,

    pub home_location: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "invalid_coordinates"))]
    pub home_latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "invalid_coordinates"))]
    pub home_longitude: Option<f64>,

    pub office_location: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "invalid_coordinates"))]
    pub office_latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "invalid_coordinates"))]
    pub office_longitude: Option<f64>,
}

// O resultado do resolvedor de organização
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTenant {
    pub tenant: Tenant,
    pub profile: Profile,
}

/// Quem age e em qual organização. Toda query com escopo recebe isto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantScope {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
}

impl TenantScope {
    pub fn new(tenant_id: Uuid, user_id: Uuid) -> Self {
        Self { tenant_id, user_id }
    }
}
