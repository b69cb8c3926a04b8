pub mod identity;
pub mod profile;
pub mod request;

pub use identity::{EmailAddress, RoleMarker, SessionIdentity, UserRecord};
pub use profile::{Address, Enrollment, EnrollmentWithStudent, Profile};
pub use request::RequestContext;
