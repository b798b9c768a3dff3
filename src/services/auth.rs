// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserStore,
    models::auth::{Claims, NewUser, RegisterUserPayload, User},
    services::tenancy_service::TenantService,
};

#[derive(Clone)]
pub struct AuthService {
    user_store: Arc<dyn UserStore>,
    tenant_service: TenantService,
    jwt_secret: String,
    token_ttl_days: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        user_store: Arc<dyn UserStore>,
        tenant_service: TenantService,
        jwt_secret: String,
        token_ttl_days: i64,
        bcrypt_cost: u32,
    ) -> Self {
        Self { user_store, tenant_service, jwt_secret, token_ttl_days, bcrypt_cost }
    }

    pub async fn register_user(&self, payload: RegisterUserPayload) -> Result<String, AppError> {
        // 1. Hashing fora do runtime (bcrypt é CPU pesado)
        let password = payload.password;
        let cost = self.bcrypt_cost;
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // 2. Cria a conta
        let full_name = payload.full_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let new_user = self
            .user_store
            .create_user(NewUser {
                email: payload.email.trim().to_lowercase(),
                password_hash: hashed_password,
                full_name,
                tenant_id: payload.tenant_id,
            })
            .await?;

        // 3. Perfil nasce junto com a conta
        self.tenant_service.ensure_profile(&new_user).await?;

        tracing::info!("👤 Usuário registrado: {}", new_user.id);
        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_store
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        // Perfil criado sob demanda no primeiro login
        self.tenant_service.ensure_profile(&user).await?;

        self.create_token(user.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.user_store
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.token_ttl_days);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
