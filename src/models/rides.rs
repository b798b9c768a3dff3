// src/models/rides.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// --- Enums ---

// Mapeia o CREATE TYPE ride_status do banco.
// Não existe estado "concluída" nem "cancelada": in_progress é terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ride_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    InProgress,
}

impl RideStatus {
    pub fn can_transition_to(self, next: RideStatus) -> bool {
        matches!((self, next), (RideStatus::Pending, RideStatus::InProgress))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::InProgress => "in_progress",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RideSort {
    #[default]
    Newest,
    Oldest,
}

// --- A Carona ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub driver_id: Uuid,
    #[schema(example = "Ana Souza")]
    pub driver_name: String,

    #[schema(example = "Downtown Office")]
    pub from_location: String,
    #[schema(example = "Tech Park")]
    pub to_location: String,
    pub from_latitude: Option<f64>,
    pub from_longitude: Option<f64>,
    pub to_latitude: Option<f64>,
    pub to_longitude: Option<f64>,
    #[schema(example = "5.2 km")]
    pub distance: Option<String>,

    pub departure_date: NaiveDate,
    #[schema(value_type = String, example = "08:30:00")]
    pub departure_time: NaiveTime,
    #[schema(example = 3)]
    pub seats_available: i32,
    pub ride_status: RideStatus,

    pub is_recurring: bool,
    // 0 = domingo ... 6 = sábado
    #[schema(example = json!([1, 3, 5]))]
    pub recurring_days: Vec<i16>,
    pub recurring_until: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ride {
    pub fn is_driver(&self, user_id: Uuid) -> bool {
        self.driver_id == user_id
    }
}

// --- Payloads ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRidePayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Downtown Office")]
    pub from_location: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Tech Park")]
    pub to_location: String,

    #[validate(range(min = -90.0, max = 90.0, message = "invalid_coordinates"))]
    pub from_latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "invalid_coordinates"))]
    pub from_longitude: Option<f64>,
    #[validate(range(min = -90.0, max = 90.0, message = "invalid_coordinates"))]
    pub to_latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "invalid_coordinates"))]
    pub to_longitude: Option<f64>,

    #[schema(value_type = String, format = Date, example = "2025-03-10")]
    pub departure_date: NaiveDate,

    // Aceita "08:30" (input type=time) ou "08:30:00"
    #[serde(deserialize_with = "deserialize_time")]
    #[schema(value_type = String, example = "08:30")]
    pub departure_time: NaiveTime,

    #[validate(range(min = 1, message = "min_seats"))]
    #[schema(example = 3)]
    pub seats_available: i32,

    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    #[schema(example = json!([1, 3, 5]))]
    pub recurring_days: Vec<i16>,
    #[schema(value_type = Option<String>, format = Date, example = "2025-06-30")]
    pub recurring_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListRidesQuery {
    /// newest (padrão) ou oldest
    pub sort: Option<RideSort>,
    pub status: Option<RideStatus>,
}

// O que o repositório insere (já validado e normalizado)
#[derive(Debug, Clone)]
pub struct NewRide {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub from_location: String,
    pub to_location: String,
    pub from_point: Option<GeoPoint>,
    pub to_point: Option<GeoPoint>,
    pub distance: Option<String>,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub seats_available: i32,
    pub recurrence: Recurrence,
}

// ---
// Coordenadas
// ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    // Latitude e longitude andam juntas: ou as duas, ou nenhuma.
    pub fn from_parts(
        field: &'static str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<GeoPoint>, AppError> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Ok(Some(GeoPoint { latitude, longitude })),
            (None, None) => Ok(None),
            _ => Err(AppError::InvalidField { field, key: "invalid_coordinates" }),
        }
    }

    /// Distância em linha reta (haversine), em quilômetros.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lng = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lng / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

pub fn format_distance(from: Option<GeoPoint>, to: Option<GeoPoint>) -> Option<String> {
    match (from, to) {
        (Some(a), Some(b)) => Some(format!("{:.1} km", a.distance_km(&b))),
        _ => None,
    }
}

// ---
// Recorrência
// ---
// Guardada apenas como dado: nenhuma ocorrência futura é materializada.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recurrence {
    pub is_recurring: bool,
    pub days: Vec<i16>,
    pub until: Option<NaiveDate>,
}

impl Recurrence {
    /// Sem recorrência, dias vazios e data final nula.
    /// Com recorrência, dias entre 0 e 6 (ordenados, sem repetição) e data final obrigatória.
    pub fn normalize(
        is_recurring: bool,
        days: Vec<i16>,
        until: Option<NaiveDate>,
        starts_on: Option<NaiveDate>,
    ) -> Result<Recurrence, AppError> {
        if !is_recurring {
            return Ok(Recurrence::default());
        }

        if days.iter().any(|d| !(0..=6).contains(d)) {
            return Err(AppError::InvalidField { field: "recurringDays", key: "invalid_recurring_days" });
        }

        let until = until.ok_or(AppError::InvalidField {
            field: "recurringUntil",
            key: "recurring_until_required",
        })?;

        if let Some(start) = starts_on {
            if until < start {
                return Err(AppError::InvalidField {
                    field: "recurringUntil",
                    key: "recurring_until_before_departure",
                });
            }
        }

        let mut days = days;
        days.sort_unstable();
        days.dedup();

        Ok(Recurrence { is_recurring: true, days, until: Some(until) })
    }
}

pub(crate) fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
        .map_err(serde::de::Error::custom)
}
