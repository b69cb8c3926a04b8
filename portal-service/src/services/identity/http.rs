use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use std::fs;

use super::{IdentityError, IdentityProvider};
use crate::config::IdentityConfig;
use crate::models::{RequestContext, SessionIdentity, UserRecord};

/// Claims the portal needs from a provider-issued session token.
#[derive(Debug, Deserialize)]
struct SessionClaims {
    /// Identity (user) id.
    sub: String,
    /// Session id.
    #[serde(default)]
    sid: Option<String>,
}

/// Identity provider reached over its backend REST API.
///
/// Sessions are verified locally against the provider's signing key, so the
/// gate does not need a network round trip per request. Directory lookups go
/// over HTTP.
pub struct HttpIdentityProvider {
    client: Client,
    api_url: Url,
    secret_key: Secret<String>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl HttpIdentityProvider {
    /// Build the provider, loading the session signing key from disk.
    pub fn new(config: &IdentityConfig) -> Result<Self, anyhow::Error> {
        let public_key_pem = fs::read_to_string(&config.jwt_public_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read session public key from {}: {}",
                config.jwt_public_key_path,
                e
            )
        })?;

        Self::with_public_key_pem(config, &public_key_pem)
    }

    pub fn with_public_key_pem(
        config: &IdentityConfig,
        public_key_pem: &str,
    ) -> Result<Self, anyhow::Error> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse session public key: {}", e))?;

        let mut validation = Validation::new(Algorithm::RS256);
        // Session tokens carry an authorized party, not an audience.
        validation.validate_aud = false;
        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }

        let api_url = Url::parse(&config.api_url)
            .map_err(|e| anyhow::anyhow!("Invalid identity API URL {}: {}", config.api_url, e))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build identity HTTP client: {}", e))?;

        tracing::info!(api_url = %api_url, "Identity provider client initialized");

        Ok(Self {
            client,
            api_url,
            secret_key: config.secret_key.clone(),
            decoding_key,
            validation,
        })
    }

    fn user_url(&self, identity_id: &str) -> Result<Url, IdentityError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                IdentityError::Unavailable(format!(
                    "Identity API URL cannot be a base: {}",
                    self.api_url
                ))
            })?
            .pop_if_empty()
            .extend(&["v1", "users", identity_id]);
        Ok(url)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify_session(
        &self,
        request: &RequestContext,
    ) -> Result<Option<SessionIdentity>, IdentityError> {
        let Some(token) = request.session_token.as_deref() else {
            return Ok(None);
        };

        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| IdentityError::InvalidSession(e.to_string()))?;

        if data.claims.sub.is_empty() {
            return Err(IdentityError::InvalidSession(
                "Session token has an empty subject".to_string(),
            ));
        }

        Ok(Some(SessionIdentity {
            identity_id: data.claims.sub,
            session_id: data.claims.sid,
        }))
    }

    async fn get_user_by_id(&self, identity_id: &str) -> Result<UserRecord, IdentityError> {
        if identity_id.trim().is_empty() {
            return Err(IdentityError::NotFound(identity_id.to_string()));
        }

        let url = self.user_url(identity_id)?;

        let response = self
            .client
            .traced_get(url.as_str())
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(identity_id = %identity_id, error = %e, "Identity lookup failed");
                IdentityError::Unavailable(e.to_string())
            })?;

        match response.status() {
            status if status.is_success() => response
                .json::<UserRecord>()
                .await
                .map_err(|e| IdentityError::InvalidResponse(e.to_string())),
            // A malformed id can never resolve, so it reads the same as a deleted one.
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(IdentityError::NotFound(identity_id.to_string()))
            }
            status => Err(IdentityError::Unavailable(format!(
                "Identity API returned {} for user lookup",
                status
            ))),
        }
    }
}
