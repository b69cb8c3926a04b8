pub mod admin;
pub mod app;
pub mod metrics;
pub mod onboarding;
pub mod user;
