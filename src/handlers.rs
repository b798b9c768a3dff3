pub mod auth;
pub mod tenancy;
pub mod rides;
pub mod ride_requests;
pub mod locations;
pub mod chat;
pub mod realtime;
pub mod classifieds;
