// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts, Query, Request, State},
    http::{header, request::Parts, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use serde::Deserialize;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::auth::User,
    services::auth::AuthService,
};

/// Subprotocolo do feed: o navegador não consegue mandar `Authorization`
/// no upgrade, então manda `Sec-WebSocket-Protocol: bearer, <token>`.
pub const WS_BEARER_PROTOCOL: &str = "bearer";

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

// O valor logo depois de "bearer" na lista de subprotocolos
fn protocol_token(headers: &HeaderMap) -> Option<String> {
    let offered = headers.get(header::SEC_WEBSOCKET_PROTOCOL)?.to_str().ok()?;
    let mut protocols = offered.split(',').map(str::trim);
    protocols.find(|p| *p == WS_BEARER_PROTOCOL)?;
    protocols.next().filter(|t| !t.is_empty()).map(str::to_string)
}

fn query_token(uri: &Uri) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// `Authorization: Bearer` sempre vence. Só no upgrade de WebSocket o token
/// também pode vir do subprotocolo ou de `?token=`.
fn bearer_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(bearer) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }
    if !is_websocket_upgrade(headers) {
        return None;
    }
    protocol_token(headers).or_else(|| query_token(uri))
}

// Headers e URI são copiados antes do await: o corpo da requisição não é Sync
async fn authenticate(auth_service: &AuthService, headers: &HeaderMap, uri: &Uri) -> Result<User, AppError> {
    let token = bearer_token(headers, uri).ok_or(AppError::InvalidToken)?;
    auth_service.validate_token(&token).await
}

// ---
// Guardião 1: só autenticação
// ---
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (headers, uri) = (request.headers().clone(), request.uri().clone());
    let user = authenticate(&app_state.auth_service, &headers, &uri)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// ---
// Guardião 2: autenticação + resolução da organização
// ---
// Nenhuma rota com escopo de organização roda sem um TenantContext.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (headers, uri) = (request.headers().clone(), request.uri().clone());
    let user = authenticate(&app_state.auth_service, &headers, &uri)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let resolved = app_state
        .tenant_service
        .resolve(&user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    request.extensions_mut().insert(TenantContext::new(user.clone(), resolved));
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let app_state = AppState::from_ref(state);
        let locale = Locale::from_parts(parts);
        Err(AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{services::tenancy_service::TenantService, test_support::MemoryStore};
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn upgrade() -> (header::HeaderName, &'static str) {
        (header::UPGRADE, "websocket")
    }

    #[rstest]
    #[case::authorization_header(vec![(header::AUTHORIZATION, "Bearer abc")], "/api/rides/1", Some("abc"))]
    #[case::subprotocol(
        vec![upgrade(), (header::SEC_WEBSOCKET_PROTOCOL, "bearer, abc")],
        "/api/rides/1/feed",
        Some("abc")
    )]
    #[case::query(vec![upgrade()], "/api/rides/1/feed?token=abc", Some("abc"))]
    #[case::header_wins(
        vec![upgrade(), (header::AUTHORIZATION, "Bearer abc")],
        "/api/rides/1/feed?token=outro",
        Some("abc")
    )]
    #[case::subprotocol_before_query(
        vec![upgrade(), (header::SEC_WEBSOCKET_PROTOCOL, "bearer, abc")],
        "/api/rides/1/feed?token=outro",
        Some("abc")
    )]
    #[case::query_outside_upgrade(vec![], "/api/rides?token=abc", None)]
    #[case::protocol_without_token(vec![upgrade(), (header::SEC_WEBSOCKET_PROTOCOL, "bearer")], "/api/rides/1/feed", None)]
    #[case::empty_query(vec![upgrade()], "/api/rides/1/feed?token=", None)]
    #[case::nothing(vec![], "/api/rides/1", None)]
    fn token_sources(
        #[case] pairs: Vec<(header::HeaderName, &str)>,
        #[case] uri: &str,
        #[case] expected: Option<&str>,
    ) {
        let uri: Uri = uri.parse().unwrap();
        assert_eq!(bearer_token(&headers(&pairs), &uri).as_deref(), expected);
    }

    async fn auth_with_user() -> (AuthService, String, User) {
        let store = MemoryStore::new();
        let tenant = store.seed_tenant("ACME");
        let auth = AuthService::new(store.clone(), TenantService::new(store.clone()), "segredo".into(), 7, 4);
        let token = auth
            .register_user(crate::models::auth::RegisterUserPayload {
                email: "ana@empresa.com".into(),
                password: "segredo123".into(),
                full_name: Some("Ana".into()),
                tenant_id: tenant.id,
            })
            .await
            .unwrap();
        let user = auth.validate_token(&token).await.unwrap();
        (auth, token, user)
    }

    #[tokio::test]
    async fn feed_upgrade_authenticates_with_the_query_token() {
        let (auth, token, user) = auth_with_user().await;
        let uri: Uri = format!("/api/rides/1/feed?token={}", token).parse().unwrap();

        let found = authenticate(&auth, &headers(&[upgrade()]), &uri).await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn feed_upgrade_authenticates_with_the_subprotocol_token() {
        let (auth, token, user) = auth_with_user().await;
        let protocols = format!("{}, {}", WS_BEARER_PROTOCOL, token);
        let uri: Uri = "/api/rides/1/feed".parse().unwrap();

        let found = authenticate(&auth, &headers(&[upgrade(), (header::SEC_WEBSOCKET_PROTOCOL, protocols.as_str())]), &uri)
            .await
            .unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn plain_requests_ignore_the_query_token() {
        let (auth, token, _) = auth_with_user().await;
        let uri: Uri = format!("/api/rides?token={}", token).parse().unwrap();

        let err = authenticate(&auth, &HeaderMap::new(), &uri).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }
}
