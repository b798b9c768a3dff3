// src/models/ride_requests.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::i18n::I18nStore;

// Mapeia o CREATE TYPE request_status do banco.
// accepted e rejected são terminais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

// A decisão do motorista: só existem dois destinos a partir de pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl Decision {
    pub fn status(self) -> RequestStatus {
        match self {
            Decision::Accepted => RequestStatus::Accepted,
            Decision::Rejected => RequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    #[schema(example = 10)]
    pub id: i64,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub ride_id: i64,
    pub requester_id: Uuid,
    #[schema(example = "Bruna Lima")]
    pub requester_name: String,
    #[schema(example = 1)]
    pub seats_requested: i32,
    pub status: RequestStatus,

    pub is_recurring: bool,
    pub recurring_days: Vec<i16>,
    pub recurring_until: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRideRequest {
    pub ride_id: i64,
    pub requester_id: Uuid,
    pub requester_name: String,
    pub seats_requested: i32,
    pub recurrence: crate::models::rides::Recurrence,
}

fn default_seats() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestSeatPayload {
    #[serde(default = "default_seats")]
    #[validate(range(min = 1, message = "min_seats"))]
    #[schema(example = 1)]
    pub seats_requested: i32,

    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_days: Vec<i16>,
    #[schema(value_type = Option<String>, format = Date)]
    pub recurring_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequestPayload {
    pub decision: Decision,
}

// ---
// Papel de quem age sobre um pedido
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestRole {
    Requester,
    Driver,
}

/// Quem não é o solicitante é tratado como motorista.
/// Só o motorista decide, então na prática esse é o único outro observador.
pub fn role_of(acting_user_id: Uuid, request: &RideRequest) -> RequestRole {
    if acting_user_id == request.requester_id {
        RequestRole::Requester
    } else {
        RequestRole::Driver
    }
}

// ---
// Aviso exibido depois de uma decisão
// ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RenderedNotice {
    #[schema(example = "Ride request accepted!")]
    pub title: String,
    pub description: String,
}

/// O aviso depende de quem o lê: o solicitante e o motorista recebem textos diferentes.
pub fn decision_notice(
    request: &RideRequest,
    role: RequestRole,
    lang: &str,
    store: &I18nStore,
) -> RenderedNotice {
    let outcome = match request.status {
        RequestStatus::Rejected => "rejected",
        // pending nunca chega aqui; cai no texto de aceite
        _ => "accepted",
    };
    let who = match role {
        RequestRole::Requester => "requester",
        RequestRole::Driver => "driver",
    };

    let params = [("name", request.requester_name.as_str())];
    RenderedNotice {
        title: store.translate(lang, &format!("notice_{}_{}_title", outcome, who), &params),
        description: store.translate(lang, &format!("notice_{}_{}_body", outcome, who), &params),
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub request: RideRequest,
    pub notice: RenderedNotice,
}
