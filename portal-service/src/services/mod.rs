pub mod admin;
pub mod database;
pub mod export;
pub mod identity;
pub mod metrics;
pub mod onboarding;
pub mod store;

pub use admin::AdminService;
pub use database::MongoProfileStore;
pub use identity::{HttpIdentityProvider, IdentityError, IdentityProvider, MockIdentityProvider};
pub use onboarding::OnboardingService;
pub use store::{MockProfileStore, ProfileStore};
