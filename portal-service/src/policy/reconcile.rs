//! Record reconciliation against the identity provider.
//!
//! Local records point at upstream identities by id, with no cascade delete
//! and no change feed. Before such records are shown, every referenced
//! identity is probed and records whose identity is gone are dropped.

use futures::future::join_all;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::services::identity::{IdentityError, IdentityProvider};

/// What to do with a record whose probe failed or timed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// An unanswered probe reads the same as a deleted identity.
    #[default]
    Prune,
    /// Keep the record while its identity is unknown.
    Keep,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prune" => Ok(FailurePolicy::Prune),
            "keep" => Ok(FailurePolicy::Keep),
            other => Err(format!("expected 'prune' or 'keep', got '{}'", other)),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Prune => write!(f, "prune"),
            FailurePolicy::Keep => write!(f, "keep"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Exists,
    Missing,
    Failed,
    TimedOut,
    /// The record carries no identity reference at all; never probed.
    Unlinked,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Exists => "exists",
            ProbeOutcome::Missing => "missing",
            ProbeOutcome::Failed => "failed",
            ProbeOutcome::TimedOut => "timed_out",
            ProbeOutcome::Unlinked => "unlinked",
        }
    }

    fn keeps(&self, policy: FailurePolicy) -> bool {
        match self {
            ProbeOutcome::Exists => true,
            ProbeOutcome::Missing | ProbeOutcome::Unlinked => false,
            ProbeOutcome::Failed | ProbeOutcome::TimedOut => policy == FailurePolicy::Keep,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<R> {
    /// Surviving records in their input order.
    pub kept: Vec<R>,
    pub pruned: Vec<(R, ProbeOutcome)>,
}

impl<R> Reconciled<R> {
    /// Count pruned records as orphans seen by `source`.
    pub fn report(&self, source: &'static str) {
        if self.pruned.is_empty() {
            return;
        }
        metrics::counter!("portal_orphaned_records_total", "source" => source)
            .increment(self.pruned.len() as u64);
        tracing::warn!(
            source,
            kept = self.kept.len(),
            pruned = self.pruned.len(),
            "Excluded records whose identity could not be confirmed"
        );
    }
}

#[derive(Clone)]
pub struct Reconciler {
    identity: Arc<dyn IdentityProvider>,
    probe_timeout: Duration,
    failure_policy: FailurePolicy,
}

impl Reconciler {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        probe_timeout: Duration,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            identity,
            probe_timeout,
            failure_policy,
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Keep the records whose identity still exists upstream.
    ///
    /// All probes run concurrently and the call returns once every probe has
    /// answered or timed out.
    pub async fn reconcile<R, F>(&self, records: Vec<R>, identity_id_of: F) -> Reconciled<R>
    where
        F: Fn(&R) -> Option<&str>,
    {
        let probes = records.iter().map(|record| {
            let identity_id = identity_id_of(record);
            async move {
                match identity_id {
                    Some(id) if !id.trim().is_empty() => self.probe(id).await,
                    _ => ProbeOutcome::Unlinked,
                }
            }
        });
        let outcomes = join_all(probes).await;

        let mut kept = Vec::with_capacity(records.len());
        let mut pruned = Vec::new();

        for (record, outcome) in records.into_iter().zip(outcomes) {
            if outcome.keeps(self.failure_policy) {
                kept.push(record);
            } else {
                tracing::warn!(
                    identity_id = identity_id_of(&record).unwrap_or("-"),
                    outcome = outcome.as_str(),
                    "Pruning record with unconfirmed identity"
                );
                pruned.push((record, outcome));
            }
        }

        Reconciled { kept, pruned }
    }

    async fn probe(&self, identity_id: &str) -> ProbeOutcome {
        let outcome = match timeout(self.probe_timeout, self.identity.get_user_by_id(identity_id))
            .await
        {
            Ok(Ok(_)) => ProbeOutcome::Exists,
            Ok(Err(IdentityError::NotFound(_))) => ProbeOutcome::Missing,
            Ok(Err(e)) => {
                tracing::warn!(identity_id = %identity_id, error = %e, "Identity probe failed");
                ProbeOutcome::Failed
            }
            Err(_) => {
                tracing::warn!(
                    identity_id = %identity_id,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "Identity probe timed out"
                );
                ProbeOutcome::TimedOut
            }
        };

        metrics::counter!(
            "portal_reconciliation_probes_total",
            "outcome" => outcome.as_str()
        )
        .increment(1);

        outcome
    }
}
