pub mod user_repo;
pub use user_repo::{UserRepository, UserStore};
pub mod tenancy_repo;
pub use tenancy_repo::{TenantRepository, TenantStore};
pub mod ride_repo;
pub use ride_repo::{RideRepository, RideStore};
pub mod ride_request_repo;
pub use ride_request_repo::{RideRequestRepository, RideRequestStore};
pub mod location_repo;
pub use location_repo::{LocationRepository, LocationStore};
pub mod chat_repo;
pub use chat_repo::{MessageRepository, MessageStore};
pub mod classified_repo;
pub use classified_repo::{ClassifiedRepository, ClassifiedStore};
