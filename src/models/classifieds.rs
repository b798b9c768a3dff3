// src/models/classifieds.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const ALL: &str = "all";
pub const DEFAULT_PER_PAGE: u32 = 12;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "classified_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedStatus {
    #[default]
    Active,
    Sold,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Classified {
    pub id: i64,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Livro de Rust")]
    pub title: String,
    pub description: String,
    #[schema(value_type = f64, example = 49.9)]
    pub price: Decimal,
    #[schema(example = "Books")]
    pub category: String,
    #[schema(example = "Tech Park")]
    pub location: String,
    pub contact_info: String,
    pub image_url: Option<String>,
    pub status: ClassifiedStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Teto da coluna NUMERIC(12, 2)
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

// Preço nunca negativo e dentro do que a coluna guarda
fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::new("invalid_price").with_message("invalid_price".into()));
    }
    if *price > MAX_PRICE {
        return Err(ValidationError::new("price_too_high").with_message("price_too_high".into()));
    }
    Ok(())
}

// Usado tanto na criação quanto na edição (PUT substitui o anúncio inteiro)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedPayload {
    #[validate(length(min = 1, message = "required"))]
    pub title: String,
    #[validate(length(min = 1, message = "required"))]
    pub description: String,
    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = f64, example = 49.9)]
    pub price: Decimal,
    #[validate(length(min = 1, message = "required"))]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[validate(length(min = 1, message = "required"))]
    pub contact_info: String,
    pub image_url: Option<String>,
    // Ignorado na criação (sempre active)
    pub status: Option<ClassifiedStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedSort {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClassifiedQuery {
    /// Busca sem diferenciar maiúsculas no título ou na descrição
    pub search: Option<String>,
    /// "all" ou ausente = qualquer categoria
    pub category: Option<String>,
    pub location: Option<String>,
    pub sort: Option<ClassifiedSort>,
    /// Começa em 1
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedPage {
    pub items: Vec<Classified>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Facets {
    pub categories: Vec<String>,
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageUploadResponse {
    pub url: String,
}

fn filter_value(value: &Option<String>) -> Option<&str> {
    match value.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(v) if v.eq_ignore_ascii_case(ALL) => None,
        Some(v) => Some(v),
    }
}

/// Filtra, ordena e pagina os anúncios já limitados à organização.
pub fn apply_query(rows: Vec<Classified>, query: &ClassifiedQuery) -> ClassifiedPage {
    let search = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let category = filter_value(&query.category);
    let location = filter_value(&query.location);

    let mut items: Vec<Classified> = rows
        .into_iter()
        .filter(|c| {
            search.as_ref().is_none_or(|s| {
                c.title.to_lowercase().contains(s) || c.description.to_lowercase().contains(s)
            })
        })
        .filter(|c| category.is_none_or(|cat| c.category == cat))
        .filter(|c| location.is_none_or(|loc| c.location == loc))
        .collect();

    // Empates resolvidos pelo id para a paginação ser estável
    match query.sort.unwrap_or_default() {
        ClassifiedSort::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))),
        ClassifiedSort::Oldest => items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))),
        ClassifiedSort::PriceAsc => items.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id))),
        ClassifiedSort::PriceDesc => items.sort_by(|a, b| b.price.cmp(&a.price).then(a.id.cmp(&b.id))),
    }

    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let page = query.page.unwrap_or(1).max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page as usize) as u32;

    let start = (page as usize - 1).saturating_mul(per_page as usize);
    let items = items.into_iter().skip(start).take(per_page as usize).collect();

    ClassifiedPage { items, total, page, per_page, total_pages }
}

/// Valores distintos para os filtros, com "all" sempre primeiro.
pub fn facets(rows: &[Classified]) -> Facets {
    let collect = |values: BTreeSet<&str>| {
        std::iter::once(ALL.to_string())
            .chain(values.into_iter().map(str::to_string))
            .collect::<Vec<_>>()
    };

    let categories = rows.iter().map(|c| c.category.as_str()).filter(|c| !c.is_empty()).collect();
    let locations = rows.iter().map(|c| c.location.as_str()).filter(|l| !l.is_empty()).collect();

    Facets { categories: collect(categories), locations: collect(locations) }
}
