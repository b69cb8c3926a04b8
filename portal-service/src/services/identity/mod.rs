//! Identity provider abstraction.
//!
//! The provider is the system of record for users and sessions. The portal
//! only ever asks three things of it: who is behind this request, does this
//! user id exist, and what does the current user look like.

pub mod http;
pub mod mock;

pub use http::HttpIdentityProvider;
pub use mock::MockIdentityProvider;

use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

use crate::models::{RequestContext, SessionIdentity, UserRecord};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Identity not found: {0}")]
    NotFound(String),

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Invalid identity provider response: {0}")]
    InvalidResponse(String),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotFound(id) => {
                AppError::NotFound(anyhow::anyhow!("Identity not found: {}", id))
            }
            IdentityError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
            IdentityError::InvalidSession(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            IdentityError::InvalidResponse(msg) => AppError::BadGateway(msg),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the session carried by the request. `Ok(None)` means the
    /// request is anonymous.
    async fn verify_session(
        &self,
        request: &RequestContext,
    ) -> Result<Option<SessionIdentity>, IdentityError>;

    /// Look up a user in the provider's directory.
    async fn get_user_by_id(&self, identity_id: &str) -> Result<UserRecord, IdentityError>;

    /// The user behind an already resolved session. A session whose user has
    /// since been deleted upstream reads as no user.
    async fn current_user(
        &self,
        session: Option<&SessionIdentity>,
    ) -> Result<Option<UserRecord>, IdentityError> {
        let Some(session) = session else {
            return Ok(None);
        };

        match self.get_user_by_id(&session.identity_id).await {
            Ok(user) => Ok(Some(user)),
            Err(IdentityError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
