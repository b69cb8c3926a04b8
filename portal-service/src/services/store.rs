//! Profile store abstraction and an in-memory implementation.

use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::{Enrollment, EnrollmentWithStudent, Profile};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile_by_identity_id(
        &self,
        identity_id: &str,
    ) -> Result<Option<Profile>, AppError>;

    /// All profiles, newest first.
    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError>;

    /// Insert or replace by `profile_id`.
    async fn save_profile(&self, profile: &Profile) -> Result<(), AppError>;

    /// All enrollments joined with their student, newest first.
    async fn list_enrollments(&self) -> Result<Vec<EnrollmentWithStudent>, AppError>;

    /// Enrollments in one course joined with their student, newest first.
    async fn list_course_enrollments(
        &self,
        course_id: &str,
    ) -> Result<Vec<EnrollmentWithStudent>, AppError>;

    async fn find_enrollments_by_profile(
        &self,
        profile_id: &str,
    ) -> Result<Vec<Enrollment>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// In-memory store. Can be switched into an outage to exercise fail-soft paths.
#[derive(Default)]
pub struct MockProfileStore {
    profiles: Mutex<Vec<Profile>>,
    enrollments: Mutex<Vec<Enrollment>>,
    unavailable: AtomicBool,
    lookups: AtomicUsize,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, profile: Profile) {
        let mut profiles = lock(&self.profiles);
        profiles.retain(|p| p.profile_id != profile.profile_id);
        profiles.push(profile);
    }

    pub fn insert_enrollment(&self, enrollment: Enrollment) {
        lock(&self.enrollments).push(enrollment);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `find_profile_by_identity_id` calls served or refused.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::ServiceUnavailable(
                "Mock profile store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn find_profile_by_identity_id(
        &self,
        identity_id: &str,
    ) -> Result<Option<Profile>, AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(lock(&self.profiles)
            .iter()
            .find(|p| p.identity_id == identity_id)
            .cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        self.check_available()?;
        let mut profiles = lock(&self.profiles).clone();
        profiles.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(profiles)
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), AppError> {
        self.check_available()?;
        self.insert_profile(profile.clone());
        Ok(())
    }

    async fn list_enrollments(&self) -> Result<Vec<EnrollmentWithStudent>, AppError> {
        self.check_available()?;
        let profiles = lock(&self.profiles).clone();
        let mut enrollments = lock(&self.enrollments).clone();
        enrollments.sort_by(|a, b| b.enrolled_utc.cmp(&a.enrolled_utc));

        Ok(enrollments
            .into_iter()
            .map(|enrollment| {
                let student = profiles
                    .iter()
                    .find(|p| p.profile_id == enrollment.profile_id)
                    .cloned();
                EnrollmentWithStudent {
                    enrollment,
                    student,
                }
            })
            .collect())
    }

    async fn list_course_enrollments(
        &self,
        course_id: &str,
    ) -> Result<Vec<EnrollmentWithStudent>, AppError> {
        let mut rows = self.list_enrollments().await?;
        rows.retain(|row| row.enrollment.course_id == course_id);
        Ok(rows)
    }

    async fn find_enrollments_by_profile(
        &self,
        profile_id: &str,
    ) -> Result<Vec<Enrollment>, AppError> {
        self.check_available()?;
        Ok(lock(&self.enrollments)
            .iter()
            .filter(|e| e.profile_id == profile_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.check_available()
    }
}
