//! In-process identity provider for tests and local runs.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{IdentityError, IdentityProvider};
use crate::models::{RequestContext, SessionIdentity, UserRecord};

/// Scripted identity provider that counts every call it receives.
#[derive(Default)]
pub struct MockIdentityProvider {
    sessions: Mutex<HashMap<String, SessionIdentity>>,
    users: Mutex<HashMap<String, UserRecord>>,
    failing_users: Mutex<HashSet<String>>,
    slow_users: Mutex<HashMap<String, Duration>>,
    sessions_unavailable: Mutex<bool>,
    verify_session_calls: AtomicUsize,
    get_user_calls: AtomicUsize,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `user` and a session token that resolves to it.
    pub fn add_session(&self, token: &str, user: UserRecord) {
        lock(&self.sessions).insert(token.to_string(), SessionIdentity::new(user.id.clone()));
        self.add_user(user);
    }

    pub fn add_user(&self, user: UserRecord) {
        lock(&self.users).insert(user.id.clone(), user);
    }

    pub fn remove_user(&self, identity_id: &str) {
        lock(&self.users).remove(identity_id);
    }

    /// Lookups for `identity_id` fail as if the provider were unreachable.
    pub fn fail_user(&self, identity_id: &str) {
        lock(&self.failing_users).insert(identity_id.to_string());
    }

    /// Lookups for `identity_id` answer only after `delay`.
    pub fn delay_user(&self, identity_id: &str, delay: Duration) {
        lock(&self.slow_users).insert(identity_id.to_string(), delay);
    }

    /// Session verification fails as if the provider were unreachable.
    pub fn set_sessions_unavailable(&self, unavailable: bool) {
        *lock(&self.sessions_unavailable) = unavailable;
    }

    pub fn verify_session_calls(&self) -> usize {
        self.verify_session_calls.load(Ordering::SeqCst)
    }

    pub fn get_user_calls(&self) -> usize {
        self.get_user_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A panicking test thread must not wedge the others.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn verify_session(
        &self,
        request: &RequestContext,
    ) -> Result<Option<SessionIdentity>, IdentityError> {
        self.verify_session_calls.fetch_add(1, Ordering::SeqCst);

        if *lock(&self.sessions_unavailable) {
            return Err(IdentityError::Unavailable(
                "Mock session verification unavailable".to_string(),
            ));
        }

        let Some(token) = request.session_token.as_deref() else {
            return Ok(None);
        };

        lock(&self.sessions)
            .get(token)
            .cloned()
            .map(Some)
            .ok_or_else(|| IdentityError::InvalidSession("Unknown session token".to_string()))
    }

    async fn get_user_by_id(&self, identity_id: &str) -> Result<UserRecord, IdentityError> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);

        let delay = lock(&self.slow_users).get(identity_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if lock(&self.failing_users).contains(identity_id) {
            return Err(IdentityError::Unavailable(format!(
                "Mock lookup failure for {}",
                identity_id
            )));
        }

        lock(&self.users)
            .get(identity_id)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(identity_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn current_user_of_deleted_identity_is_none() {
        let provider = MockIdentityProvider::new();
        provider.add_session("tok", UserRecord::new("user_1", "a@example.com"));
        provider.remove_user("user_1");

        let session = SessionIdentity::new("user_1");
        let user = provider.current_user(Some(&session)).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn current_user_propagates_outage() {
        let provider = MockIdentityProvider::new();
        provider.fail_user("user_1");

        let session = SessionIdentity::new("user_1");
        let err = provider.current_user(Some(&session)).await.unwrap_err();
        assert!(matches!(err, IdentityError::Unavailable(_)));
    }

    #[tokio::test]
    async fn no_session_means_no_current_user() {
        let provider = MockIdentityProvider::new();
        assert!(provider.current_user(None).await.unwrap().is_none());
        assert_eq!(provider.get_user_calls(), 0);
    }
}
