//! Admin authorization check.

use serde::Serialize;

use crate::models::SessionIdentity;
use crate::policy::routes::{DASHBOARD_PATH, SIGN_IN_PATH};
use crate::services::identity::IdentityProvider;

/// Admin email addresses from deployment configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: Vec<String>,
}

impl AdminAllowList {
    /// Comma separated; entries are trimmed and empty entries dropped.
    pub fn parse(raw: &str) -> Self {
        let emails = raw
            .split(',')
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(str::to_string)
            .collect();
        Self { emails }
    }

    pub fn contains(&self, email: &str) -> bool {
        let email = email.trim();
        self.emails.iter().any(|allowed| allowed == email)
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// Which rule made the caller an admin. Role metadata is checked first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminGrant {
    Role,
    AllowList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminPrincipal {
    pub identity_id: String,
    pub email: Option<String>,
    pub granted_by: AdminGrant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    Authorized(AdminPrincipal),
    Unauthorized { redirect_target: &'static str },
}

impl AuthorizationResult {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationResult::Authorized(_))
    }

    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            AuthorizationResult::Authorized(_) => None,
            AuthorizationResult::Unauthorized { redirect_target } => Some(*redirect_target),
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            AuthorizationResult::Authorized(_) => "authorized",
            AuthorizationResult::Unauthorized { redirect_target }
                if *redirect_target == SIGN_IN_PATH =>
            {
                "unauthenticated"
            }
            AuthorizationResult::Unauthorized { .. } => "forbidden",
        }
    }
}

/// Decide whether the caller may use admin pages.
///
/// No user behind the session sends the caller to sign-in. A signed-in user
/// who is not an admin, or whose record cannot be fetched, goes to the
/// dashboard instead: a permissions problem never prompts a new sign-in.
pub async fn check_admin_access(
    identity: &dyn IdentityProvider,
    session: Option<&SessionIdentity>,
    allow_list: &AdminAllowList,
) -> AuthorizationResult {
    let result = match identity.current_user(session).await {
        Ok(None) => AuthorizationResult::Unauthorized {
            redirect_target: SIGN_IN_PATH,
        },
        Ok(Some(user)) => {
            let email = user.primary_email().map(str::to_string);
            let grant = if user.role().is_admin() {
                Some(AdminGrant::Role)
            } else if email.as_deref().is_some_and(|e| allow_list.contains(e)) {
                Some(AdminGrant::AllowList)
            } else {
                None
            };

            match grant {
                Some(granted_by) => AuthorizationResult::Authorized(AdminPrincipal {
                    identity_id: user.id,
                    email,
                    granted_by,
                }),
                None => {
                    tracing::info!(identity_id = %user.id, "Admin access denied");
                    AuthorizationResult::Unauthorized {
                        redirect_target: DASHBOARD_PATH,
                    }
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Admin check could not load the current user");
            AuthorizationResult::Unauthorized {
                redirect_target: DASHBOARD_PATH,
            }
        }
    };

    metrics::counter!("portal_admin_checks_total", "outcome" => result.outcome_label())
        .increment(1);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRecord;
    use crate::services::identity::MockIdentityProvider;

    fn session() -> SessionIdentity {
        SessionIdentity::new("user_1")
    }

    #[test]
    fn allow_list_trims_and_drops_empty_entries() {
        let list = AdminAllowList::parse(" ops@example.com , ,dean@example.com,, ");
        assert_eq!(list, AdminAllowList::parse("ops@example.com,dean@example.com"));
        assert!(!list.contains(""));
        assert!(list.contains("ops@example.com"));
        assert!(list.contains(" dean@example.com "));
        assert!(!list.contains("student@example.com"));
        assert!(AdminAllowList::parse("  ").is_empty());
    }

    #[tokio::test]
    async fn role_admin_outside_allow_list_is_authorized() {
        let provider = MockIdentityProvider::new();
        provider.add_user(UserRecord::new("user_1", "someone@example.com").with_role("admin"));
        let list = AdminAllowList::parse("ops@example.com");

        let result = check_admin_access(&provider, Some(&session()), &list).await;
        match result {
            AuthorizationResult::Authorized(principal) => {
                assert_eq!(principal.identity_id, "user_1");
                assert_eq!(principal.granted_by, AdminGrant::Role);
            }
            other => panic!("expected authorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn allow_listed_email_without_role_is_authorized() {
        let provider = MockIdentityProvider::new();
        provider.add_user(UserRecord::new("user_1", "ops@example.com"));
        let list = AdminAllowList::parse("dean@example.com,  ops@example.com  ");

        let result = check_admin_access(&provider, Some(&session()), &list).await;
        assert!(result.is_authorized());
        assert!(matches!(
            result,
            AuthorizationResult::Authorized(AdminPrincipal {
                granted_by: AdminGrant::AllowList,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn neither_rule_sends_to_dashboard() {
        let provider = MockIdentityProvider::new();
        provider.add_user(UserRecord::new("user_1", "student@example.com").with_role("student"));
        let list = AdminAllowList::parse("ops@example.com");

        let result = check_admin_access(&provider, Some(&session()), &list).await;
        assert_eq!(result.redirect_target(), Some("/dashboard"));
    }

    #[tokio::test]
    async fn no_identity_sends_to_sign_in() {
        let provider = MockIdentityProvider::new();
        let list = AdminAllowList::parse("ops@example.com");

        let result = check_admin_access(&provider, None, &list).await;
        assert_eq!(result.redirect_target(), Some("/sign-in"));
        assert_eq!(provider.get_user_calls(), 0);
    }

    #[tokio::test]
    async fn deleted_identity_sends_to_sign_in() {
        let provider = MockIdentityProvider::new();
        let list = AdminAllowList::default();

        let result = check_admin_access(&provider, Some(&session()), &list).await;
        assert_eq!(result.redirect_target(), Some("/sign-in"));
    }

    #[tokio::test]
    async fn provider_outage_sends_to_dashboard() {
        let provider = MockIdentityProvider::new();
        provider.add_user(UserRecord::new("user_1", "ops@example.com").with_role("admin"));
        provider.fail_user("user_1");
        let list = AdminAllowList::parse("ops@example.com");

        let result = check_admin_access(&provider, Some(&session()), &list).await;
        assert_eq!(result.redirect_target(), Some("/dashboard"));
    }
}
