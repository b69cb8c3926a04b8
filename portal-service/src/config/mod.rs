use secrecy::Secret;
use service_core::config::{self as core_config, get_env, get_env_parsed, Environment};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

use crate::policy::admin::AdminAllowList;
use crate::policy::reconcile::FailurePolicy;

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    /// OTLP collector endpoint; empty disables span export.
    pub otlp_endpoint: String,
    /// Externally visible origin, used to rebuild absolute request URLs.
    pub public_url: String,
    pub mongodb: MongoConfig,
    pub identity: IdentityConfig,
    pub admin: AdminConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Base URL of the identity provider's backend API.
    pub api_url: String,
    pub secret_key: Secret<String>,
    /// PEM public key that signs session tokens.
    pub jwt_public_key_path: String,
    pub jwt_issuer: Option<String>,
    pub session_cookie: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub emails: AdminAllowList,
}

#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    pub probe_timeout: Duration,
    pub failure_policy: FailurePolicy,
    /// `None` disables the background compaction job.
    pub compaction_interval: Option<Duration>,
}

impl PortalConfig {
    pub fn load() -> Result<Self, AppError> {
        // Handles .env and the APP__ prefix
        let common_config = core_config::Config::load()?;

        let environment = Environment::current()?;
        let is_prod = environment.is_prod();

        let probe_timeout_ms: u64 =
            get_env_parsed("RECONCILE_PROBE_TIMEOUT_MS", Some("3000"), is_prod)?;
        let identity_timeout_ms: u64 =
            get_env_parsed("IDENTITY_REQUEST_TIMEOUT_MS", Some("5000"), is_prod)?;
        let compaction_seconds: u64 =
            get_env_parsed("COMPACTION_INTERVAL_SECONDS", Some("0"), is_prod)?;

        Ok(PortalConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("portal-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: get_env("OTEL_EXPORTER_OTLP_ENDPOINT", Some(""), is_prod)?,
            public_url: get_env("PUBLIC_URL", Some("http://localhost:8080"), is_prod)?,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("portal_db"), is_prod)?,
            },
            identity: IdentityConfig {
                api_url: get_env("IDENTITY_API_URL", Some("https://api.clerk.com"), is_prod)?,
                secret_key: Secret::new(get_env("IDENTITY_SECRET_KEY", None, is_prod)?),
                jwt_public_key_path: get_env("IDENTITY_JWT_PUBLIC_KEY_PATH", None, is_prod)?,
                jwt_issuer: env::var("IDENTITY_JWT_ISSUER")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                session_cookie: get_env("IDENTITY_SESSION_COOKIE", Some("__session"), is_prod)?,
                request_timeout: Duration::from_millis(identity_timeout_ms),
            },
            admin: AdminConfig {
                // An empty allow-list is valid: admins then come from role metadata only.
                emails: AdminAllowList::parse(&env::var("ADMIN_EMAILS").unwrap_or_default()),
            },
            reconciliation: ReconciliationConfig {
                probe_timeout: Duration::from_millis(probe_timeout_ms),
                failure_policy: get_env_parsed("RECONCILE_FAILURE_POLICY", Some("prune"), is_prod)?,
                compaction_interval: (compaction_seconds > 0)
                    .then(|| Duration::from_secs(compaction_seconds)),
            },
        })
    }
}
