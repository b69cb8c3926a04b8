pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod services;
pub mod startup;
pub mod workers;

use std::sync::Arc;
use std::time::Duration;

use config::PortalConfig;
use policy::{AccessPolicy, AdminAllowList, FailurePolicy, Reconciler, RouteTable};
use services::{AdminService, IdentityProvider, OnboardingService, ProfileStore};

/// Settings the gate and the admin check read on every request.
#[derive(Debug, Clone)]
pub struct GateSettings {
    pub public_url: String,
    pub session_cookie: String,
    pub admin_emails: AdminAllowList,
    pub probe_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl GateSettings {
    pub fn from_config(config: &PortalConfig) -> Self {
        Self {
            public_url: config.public_url.clone(),
            session_cookie: config.identity.session_cookie.clone(),
            admin_emails: config.admin.emails.clone(),
            probe_timeout: config.reconciliation.probe_timeout,
            failure_policy: config.reconciliation.failure_policy,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub policy: AccessPolicy,
    pub reconciler: Reconciler,
    pub onboarding: OnboardingService,
    pub admin: AdminService,
    pub gate: GateSettings,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        gate: GateSettings,
    ) -> Self {
        let policy = AccessPolicy::new(RouteTable::default(), identity.clone(), profiles.clone());
        let reconciler = Reconciler::new(identity.clone(), gate.probe_timeout, gate.failure_policy);
        let onboarding = OnboardingService::new(identity.clone(), profiles.clone());
        let admin = AdminService::new(profiles.clone(), reconciler.clone());

        Self {
            identity,
            profiles,
            policy,
            reconciler,
            onboarding,
            admin,
            gate,
        }
    }
}
