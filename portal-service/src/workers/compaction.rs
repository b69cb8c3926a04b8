//! Periodic orphan report.
//!
//! Runs the same reconciliation as the admin listings over every stored
//! profile, off the request path. It only reports; nothing is deleted.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::Profile;
use crate::policy::reconcile::{Reconciled, Reconciler};
use crate::services::store::ProfileStore;

pub struct CompactionJob {
    profiles: Arc<dyn ProfileStore>,
    reconciler: Reconciler,
    interval: Duration,
    shutdown_token: CancellationToken,
}

impl CompactionJob {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        reconciler: Reconciler,
        interval: Duration,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            profiles,
            reconciler,
            interval,
            shutdown_token,
        }
    }

    /// Spawn the loop. The first pass runs one full interval after start.
    pub fn start(self) -> JoinHandle<()> {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Starting orphan compaction job"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown_token.cancelled() => {
                        tracing::info!("Orphan compaction job shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            tracing::error!(error = %e, "Orphan compaction pass failed");
                        }
                    }
                }
            }
        })
    }

    /// One reconciliation pass over every stored profile.
    pub async fn run_once(&self) -> Result<Reconciled<Profile>, service_core::error::AppError> {
        let profiles = self.profiles.list_profiles().await?;
        let scanned = profiles.len();

        let reconciled = self
            .reconciler
            .reconcile(profiles, |p| Some(p.identity_id.as_str()))
            .await;
        reconciled.report("compaction");

        for (profile, outcome) in &reconciled.pruned {
            tracing::warn!(
                profile_id = %profile.profile_id,
                identity_id = %profile.identity_id,
                outcome = outcome.as_str(),
                "Orphaned profile"
            );
        }

        tracing::info!(
            scanned,
            orphaned = reconciled.pruned.len(),
            "Orphan compaction pass finished"
        );

        Ok(reconciled)
    }
}
