// src/services/tenancy_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::TenantStore,
    models::{
        auth::User,
        rides::GeoPoint,
        tenancy::{NewProfile, Profile, ResolvedTenant, Tenant, UpdateProfilePayload},
    },
};

#[derive(Clone)]
pub struct TenantService {
    tenant_store: Arc<dyn TenantStore>,
}

impl TenantService {
    pub fn new(tenant_store: Arc<dyn TenantStore>) -> Self {
        Self { tenant_store }
    }

    /// Cria uma organização. Público: é o primeiro passo antes de registrar funcionários.
    pub async fn create_tenant(&self, name: &str) -> Result<Tenant, AppError> {
        let tenant = self.tenant_store.create_tenant(name.trim()).await?;
        tracing::info!("🏢 Organização criada: {} ({})", tenant.name, tenant.id);
        Ok(tenant)
    }

    /// Garante que o usuário tem perfil, criando-o a partir da conta se preciso.
    pub async fn ensure_profile(&self, user: &User) -> Result<Profile, AppError> {
        if let Some(profile) = self.tenant_store.find_profile(user.id).await? {
            return Ok(profile);
        }

        tracing::info!("Criando perfil para o usuário {}", user.id);
        self.tenant_store
            .create_profile(NewProfile {
                id: user.id,
                tenant_id: user.tenant_id,
                email: Some(user.email.clone()),
                full_name: user.full_name.clone(),
            })
            .await
    }

    /// O resolvedor de organização: perfil -> tenant_id -> organização.
    /// Qualquer falha vira TenantNotResolved; nunca cai numa query sem escopo.
    pub async fn resolve(&self, user: &User) -> Result<ResolvedTenant, AppError> {
        let profile = self.ensure_profile(user).await.map_err(|e| {
            tracing::error!("Falha ao carregar perfil de {}: {}", user.id, e);
            AppError::TenantNotResolved
        })?;

        let tenant = self
            .tenant_store
            .find_tenant(profile.tenant_id)
            .await
            .map_err(|e| {
                tracing::error!("Falha ao carregar organização {}: {}", profile.tenant_id, e);
                AppError::TenantNotResolved
            })?
            .ok_or(AppError::TenantNotResolved)?;

        Ok(ResolvedTenant { tenant, profile })
    }

    pub async fn update_profile(&self, user: &User, payload: UpdateProfilePayload) -> Result<Profile, AppError> {
        GeoPoint::from_parts("homeLatitude", payload.home_latitude, payload.home_longitude)?;
        GeoPoint::from_parts("officeLatitude", payload.office_latitude, payload.office_longitude)?;

        // Perfil pode ainda não existir (usuário nunca resolveu a organização)
        self.ensure_profile(user).await?;

        self.tenant_store
            .update_profile(user.id, payload)
            .await?
            .ok_or(AppError::UserNotFound)
    }
}
