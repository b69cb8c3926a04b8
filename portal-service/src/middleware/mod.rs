pub mod access;
pub mod admin;

pub use access::{access_gate_middleware, CurrentSession};
pub use admin::{admin_middleware, AdminUser};
