//! Request-time access policy.
//!
//! Everything in here is a function of its inputs plus the identity and
//! profile adapters it is handed. The HTTP layer lives in `crate::middleware`.

pub mod access;
pub mod admin;
pub mod reconcile;
pub mod routes;

pub use access::{AccessDecision, AccessPolicy, PolicyOutcome};
pub use admin::{check_admin_access, AdminAllowList, AuthorizationResult};
pub use reconcile::{FailurePolicy, ProbeOutcome, Reconciled, Reconciler};
pub use routes::{is_static_asset, RouteClass, RoutePattern, RouteTable};
