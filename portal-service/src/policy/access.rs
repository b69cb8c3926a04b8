//! Access policy engine.
//!
//! Decides, per request, whether to pass through or where to send the
//! client instead. The engine holds no per-request state, so evaluating the
//! same request against the same identity and profile snapshot always gives
//! the same decision.

use std::sync::Arc;

use crate::models::{RequestContext, SessionIdentity};
use crate::policy::routes::{
    RouteClass, RouteTable, DASHBOARD_PATH, ONBOARDING_PATH, SIGN_IN_PATH,
};
use crate::services::identity::{IdentityError, IdentityProvider};
use crate::services::store::ProfileStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Continue,
    /// `redirect_url` is the absolute URL the client originally asked for.
    RedirectToSignIn { redirect_url: String },
    RedirectToOnboarding,
    RedirectToDashboard,
}

impl AccessDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDecision::Continue => "continue",
            AccessDecision::RedirectToSignIn { .. } => "sign_in",
            AccessDecision::RedirectToOnboarding => "onboarding",
            AccessDecision::RedirectToDashboard => "dashboard",
        }
    }

    /// Redirect target, or `None` for [`AccessDecision::Continue`].
    pub fn location(&self) -> Option<String> {
        match self {
            AccessDecision::Continue => None,
            AccessDecision::RedirectToSignIn { redirect_url } => {
                Some(sign_in_location(redirect_url))
            }
            AccessDecision::RedirectToOnboarding => Some(ONBOARDING_PATH.to_string()),
            AccessDecision::RedirectToDashboard => Some(DASHBOARD_PATH.to_string()),
        }
    }
}

/// `/sign-in?redirect_url=<url>`. Falls back to the bare sign-in page if the
/// URL cannot be encoded.
pub fn sign_in_location(redirect_url: &str) -> String {
    match serde_urlencoded::to_string([("redirect_url", redirect_url)]) {
        Ok(query) => format!("{}?{}", SIGN_IN_PATH, query),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode sign-in redirect_url");
            SIGN_IN_PATH.to_string()
        }
    }
}

/// Decision plus the identity it was made for, so the HTTP layer can hand
/// the resolved session to handlers without resolving it twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub route: RouteClass,
    pub decision: AccessDecision,
    pub identity: Option<SessionIdentity>,
}

#[derive(Clone)]
pub struct AccessPolicy {
    routes: RouteTable,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
}

impl AccessPolicy {
    pub fn new(
        routes: RouteTable,
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            routes,
            identity,
            profiles,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub async fn evaluate(&self, request: &RequestContext) -> PolicyOutcome {
        let outcome = self.decide(request).await;

        metrics::counter!(
            "portal_access_decisions_total",
            "decision" => outcome.decision.as_str()
        )
        .increment(1);

        if outcome.decision != AccessDecision::Continue {
            tracing::debug!(
                path = %request.path,
                route = outcome.route.as_str(),
                decision = outcome.decision.as_str(),
                "Access policy redirect"
            );
        }

        outcome
    }

    async fn decide(&self, request: &RequestContext) -> PolicyOutcome {
        let route = self.routes.classify(&request.path);

        // Public routes never touch the identity provider.
        if route == RouteClass::Public {
            return PolicyOutcome {
                route,
                decision: AccessDecision::Continue,
                identity: None,
            };
        }

        let Some(identity) = self.resolve_session(request).await else {
            return PolicyOutcome {
                route,
                decision: AccessDecision::RedirectToSignIn {
                    redirect_url: request.url.clone(),
                },
                identity: None,
            };
        };

        let onboarded = self.has_completed_onboarding(&identity).await;

        let decision = match (route, onboarded) {
            (RouteClass::Onboarding, false) => AccessDecision::Continue,
            (_, false) => AccessDecision::RedirectToOnboarding,
            (RouteClass::Onboarding, true) => AccessDecision::RedirectToDashboard,
            (_, true) => AccessDecision::Continue,
        };

        PolicyOutcome {
            route,
            decision,
            identity: Some(identity),
        }
    }

    /// Any failure to resolve a session reads as an anonymous request.
    async fn resolve_session(&self, request: &RequestContext) -> Option<SessionIdentity> {
        match self.identity.verify_session(request).await {
            Ok(identity) => identity,
            Err(IdentityError::InvalidSession(reason)) => {
                tracing::debug!(path = %request.path, reason = %reason, "Rejected session token");
                None
            }
            Err(e) => {
                tracing::warn!(
                    path = %request.path,
                    error = %e,
                    "Session verification failed, treating request as anonymous"
                );
                None
            }
        }
    }

    /// A store failure reads as "no profile": onboarding is safe to re-prompt.
    async fn has_completed_onboarding(&self, identity: &SessionIdentity) -> bool {
        match self
            .profiles
            .find_profile_by_identity_id(&identity.identity_id)
            .await
        {
            Ok(profile) => profile.is_some_and(|p| p.onboarding_completed),
            Err(e) => {
                tracing::warn!(
                    identity_id = %identity.identity_id,
                    error = %e,
                    "Profile lookup failed, treating profile as absent"
                );
                false
            }
        }
    }
}
