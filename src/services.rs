pub mod auth;
pub mod tenancy_service;
pub mod realtime;
pub mod storage;
pub mod ride_service;
pub mod ride_request_service;
pub mod location_service;
pub mod chat_service;
pub mod classified_service;
