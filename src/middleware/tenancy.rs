// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{
        auth::User,
        tenancy::{Profile, ResolvedTenant, Tenant, TenantScope},
    },
};

// O contexto que o tenant_guard deixa nos extensions:
// quem é o usuário e a organização à qual ele pertence.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub user: User,
    pub tenant: Tenant,
    pub profile: Profile,
}

impl TenantContext {
    pub fn new(user: User, resolved: ResolvedTenant) -> Self {
        Self { user, tenant: resolved.tenant, profile: resolved.profile }
    }

    pub fn scope(&self) -> TenantScope {
        TenantScope::new(self.tenant.id, self.user.id)
    }

    /// Nome do perfil, senão o da conta. Pode ser None (vira "Anonymous" adiante).
    pub fn display_name(&self) -> Option<&str> {
        self.profile
            .full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.user.full_name.as_deref())
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<TenantContext>() {
            return Ok(context.clone());
        }

        // Rota sem tenant_guard: nunca seguimos sem escopo
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_parts(parts);
        Err(AppError::TenantNotResolved.to_api_error(&locale, &app_state.i18n_store))
    }
}
