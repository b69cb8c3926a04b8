use chrono::Utc;
use service_core::error::AppError;
use std::sync::Arc;
use validator::Validate;

use crate::dtos::OnboardingRequest;
use crate::models::{Profile, SessionIdentity};
use crate::services::identity::IdentityProvider;
use crate::services::store::ProfileStore;

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Completed(Profile),
    /// The profile was already onboarded; nothing was written.
    AlreadyCompleted(Profile),
}

impl SubmissionOutcome {
    pub fn into_profile(self) -> Profile {
        match self {
            SubmissionOutcome::Completed(p) | SubmissionOutcome::AlreadyCompleted(p) => p,
        }
    }
}

/// Creates or completes the caller's profile.
#[derive(Clone)]
pub struct OnboardingService {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
}

impl OnboardingService {
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { identity, profiles }
    }

    pub async fn status(&self, session: &SessionIdentity) -> Result<Option<Profile>, AppError> {
        self.profiles
            .find_profile_by_identity_id(&session.identity_id)
            .await
    }

    pub async fn submit(
        &self,
        session: &SessionIdentity,
        request: OnboardingRequest,
    ) -> Result<SubmissionOutcome, AppError> {
        let existing = self
            .profiles
            .find_profile_by_identity_id(&session.identity_id)
            .await?;

        // Completion is one-way; a second submission changes nothing.
        if let Some(profile) = existing.as_ref().filter(|p| p.onboarding_completed) {
            tracing::info!(identity_id = %session.identity_id, "Onboarding already completed");
            return Ok(SubmissionOutcome::AlreadyCompleted(profile.clone()));
        }

        let request = request.normalized();
        request.validate()?;

        let image_url = match self.identity.current_user(Some(session)).await {
            Ok(Some(user)) => user.image_url,
            Ok(None) => {
                return Err(AppError::Unauthorized(anyhow::anyhow!(
                    "Identity {} no longer exists",
                    session.identity_id
                )));
            }
            Err(e) => {
                tracing::warn!(
                    identity_id = %session.identity_id,
                    error = %e,
                    "Could not load identity record, keeping stored image"
                );
                None
            }
        };

        let mut profile = existing.unwrap_or_else(|| Profile::new(&session.identity_id));
        profile.address = request.address();
        profile.first_name = request.first_name;
        profile.last_name = request.last_name;
        profile.email = request.email;
        profile.phone = request.phone;
        profile.image_url = image_url.or(profile.image_url);
        profile.onboarding_completed = true;
        profile.updated_utc = Utc::now();

        self.profiles.save_profile(&profile).await?;

        tracing::info!(
            identity_id = %profile.identity_id,
            profile_id = %profile.profile_id,
            "Onboarding completed"
        );

        Ok(SubmissionOutcome::Completed(profile))
    }
}
