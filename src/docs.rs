// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::current_tenant,
        handlers::tenancy::get_profile,
        handlers::tenancy::update_profile,

        // --- Rides ---
        handlers::rides::list_rides,
        handlers::rides::create_ride,
        handlers::rides::get_ride,
        handlers::rides::start_ride,

        // --- Ride Requests ---
        handlers::ride_requests::list_requests,
        handlers::ride_requests::request_seat,
        handlers::ride_requests::decide_request,

        // --- Live Location ---
        handlers::locations::list_locations,
        handlers::locations::share_location,
        handlers::realtime::ride_feed,

        // --- Chat ---
        handlers::chat::list_messages,
        handlers::chat::send_message,

        // --- Classifieds ---
        handlers::classifieds::list_classifieds,
        handlers::classifieds::get_facets,
        handlers::classifieds::create_classified,
        handlers::classifieds::get_classified,
        handlers::classifieds::update_classified,
        handlers::classifieds::delete_classified,
        handlers::classifieds::upload_image,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Tenancy ---
            models::tenancy::Tenant,
            models::tenancy::Profile,
            models::tenancy::UpdateProfilePayload,
            models::tenancy::ResolvedTenant,
            handlers::tenancy::CreateTenantPayload,

            // --- Rides ---
            models::rides::RideStatus,
            models::rides::RideSort,
            models::rides::Ride,
            models::rides::CreateRidePayload,

            // --- Ride Requests ---
            models::ride_requests::RequestStatus,
            models::ride_requests::Decision,
            models::ride_requests::RideRequest,
            models::ride_requests::RequestSeatPayload,
            models::ride_requests::DecideRequestPayload,
            models::ride_requests::RequestRole,
            models::ride_requests::RenderedNotice,
            models::ride_requests::DecisionOutcome,

            // --- Live Location ---
            models::locations::UserType,
            models::locations::UserLocation,
            models::locations::ShareLocationPayload,
            models::locations::PositionErrorReason,
            services::realtime::RideEvent,

            // --- Chat ---
            models::chat::Message,
            models::chat::SendMessagePayload,

            // --- Classifieds ---
            models::classifieds::ClassifiedStatus,
            models::classifieds::Classified,
            models::classifieds::ClassifiedPayload,
            models::classifieds::ClassifiedSort,
            models::classifieds::ClassifiedPage,
            models::classifieds::Facets,
            models::classifieds::ImageUploadResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário"),
        (name = "Tenancy", description = "Organizações"),
        (name = "Profile", description = "Perfil do Usuário na Organização"),
        (name = "Rides", description = "Publicação e Ciclo de Vida das Caronas"),
        (name = "Ride Requests", description = "Pedidos de Vaga e Decisões do Motorista"),
        (name = "Live Location", description = "Localização ao Vivo e Feed da Carona"),
        (name = "Chat", description = "Mensagens da Carona"),
        (name = "Classifieds", description = "Classificados da Organização")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_ride_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/rides/{id}/start"));
        assert!(doc.paths.paths.contains_key("/api/requests/{id}/decision"));
        assert!(doc.paths.paths.contains_key("/api/classifieds/facets"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
