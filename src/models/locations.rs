// src/models/locations.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Driver,
    Rider,
}

// Uma linha por (user_id, ride_id): a última posição vence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub ride_id: i64,
    pub user_id: Uuid,
    pub user_type: UserType,
    #[schema(example = -23.5614)]
    pub latitude: f64,
    #[schema(example = -46.6559)]
    pub longitude: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LocationUpsert {
    pub ride_id: i64,
    pub user_id: Uuid,
    pub user_type: UserType,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ShareLocationPayload {
    #[validate(range(min = -90.0, max = 90.0, message = "invalid_coordinates"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "invalid_coordinates"))]
    pub longitude: f64,
}

// Por que o aparelho não conseguiu ler a posição
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PositionErrorReason {
    PermissionDenied,
    Unavailable,
    Timeout,
}

impl PositionErrorReason {
    pub fn notice_key(self) -> &'static str {
        match self {
            PositionErrorReason::PermissionDenied => "notice_location_permission_denied",
            PositionErrorReason::Unavailable => "notice_location_unavailable",
            PositionErrorReason::Timeout => "notice_location_timeout",
        }
    }
}
