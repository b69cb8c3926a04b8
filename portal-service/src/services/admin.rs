//! Admin listings. Every listing that names students is reconciled against
//! the identity provider before it is returned.

use service_core::error::AppError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::dtos::{
    AnalyticsResponse, CourseDetailsResponse, CourseStats, EnrollmentSummary,
    EnrollmentsResponse, StudentSummary, StudentsResponse,
};
use crate::models::{Enrollment, EnrollmentWithStudent};
use crate::policy::reconcile::{Reconciled, Reconciler};
use crate::services::export::students_csv;
use crate::services::store::ProfileStore;

/// Minor currency units to major.
fn major_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

fn revenue<'a>(enrollments: impl IntoIterator<Item = &'a Enrollment>) -> f64 {
    major_units(enrollments.into_iter().map(|e| e.amount).sum())
}

#[derive(Clone)]
pub struct AdminService {
    profiles: Arc<dyn ProfileStore>,
    reconciler: Reconciler,
}

impl AdminService {
    pub fn new(profiles: Arc<dyn ProfileStore>, reconciler: Reconciler) -> Self {
        Self {
            profiles,
            reconciler,
        }
    }

    /// Students whose identity still exists, each with their enrollments.
    pub async fn list_students(&self) -> Result<StudentsResponse, AppError> {
        let profiles = self.profiles.list_profiles().await?;
        let rows = self.profiles.list_enrollments().await?;

        let mut by_profile: HashMap<String, Vec<Enrollment>> = HashMap::new();
        for row in rows {
            by_profile
                .entry(row.enrollment.profile_id.clone())
                .or_default()
                .push(row.enrollment);
        }

        let reconciled = self
            .reconciler
            .reconcile(profiles, |p| Some(p.identity_id.as_str()))
            .await;
        reconciled.report("admin_students");

        let students: Vec<_> = reconciled
            .kept
            .into_iter()
            .map(|profile| {
                let enrollments = by_profile.remove(&profile.profile_id).unwrap_or_default();
                StudentSummary::new(profile, enrollments)
            })
            .collect();

        Ok(StudentsResponse {
            total: students.len(),
            excluded: reconciled.pruned.len(),
            students,
        })
    }

    /// The reconciled student listing as CSV.
    pub async fn export_students(&self) -> Result<String, AppError> {
        let listing = self.list_students().await?;
        Ok(students_csv(&listing.students))
    }

    pub async fn list_enrollments(&self) -> Result<EnrollmentsResponse, AppError> {
        let rows = self.profiles.list_enrollments().await?;
        let reconciled = self.reconcile_enrollments(rows, "admin_enrollments").await;

        let total_revenue = revenue(reconciled.kept.iter().map(|row| &row.enrollment));
        let excluded = reconciled.pruned.len();
        let enrollments: Vec<EnrollmentSummary> = reconciled
            .kept
            .into_iter()
            .map(EnrollmentSummary::from)
            .collect();

        Ok(EnrollmentsResponse {
            total: enrollments.len(),
            total_revenue,
            excluded,
            enrollments,
        })
    }

    /// One course's enrollments with their count and revenue. A course with
    /// no enrollment on record is not found.
    pub async fn course_details(&self, course_id: &str) -> Result<CourseDetailsResponse, AppError> {
        let rows = self.profiles.list_course_enrollments(course_id).await?;
        let Some(first) = rows.first() else {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "No enrollments for course {}",
                course_id
            )));
        };
        let course_title = first.enrollment.course_title.clone();

        let reconciled = self.reconcile_enrollments(rows, "admin_course").await;

        let total_revenue = revenue(reconciled.kept.iter().map(|row| &row.enrollment));
        let excluded = reconciled.pruned.len();
        let enrollments: Vec<EnrollmentSummary> = reconciled
            .kept
            .into_iter()
            .map(EnrollmentSummary::from)
            .collect();

        Ok(CourseDetailsResponse {
            course_id: course_id.to_string(),
            course_title,
            total_enrollments: enrollments.len(),
            total_revenue,
            excluded,
            enrollments,
        })
    }

    /// Per-course enrollment counts and revenue straight from the store.
    /// Aggregates only, so no identity lookups are made.
    pub async fn analytics(&self) -> Result<AnalyticsResponse, AppError> {
        let rows = self.profiles.list_enrollments().await?;
        let total_students = self.profiles.list_profiles().await?.len();

        // course_id -> (title, enrollments, revenue in minor units)
        let mut by_course: BTreeMap<&str, (&str, usize, i64)> = BTreeMap::new();
        for row in &rows {
            let e = &row.enrollment;
            let entry = by_course
                .entry(e.course_id.as_str())
                .or_insert((e.course_title.as_str(), 0, 0));
            entry.1 += 1;
            entry.2 += e.amount;
        }

        let mut courses: Vec<CourseStats> = by_course
            .into_iter()
            .map(|(course_id, (title, count, minor))| CourseStats {
                course_id: course_id.to_string(),
                course_title: title.to_string(),
                enrollment_count: count,
                total_revenue: major_units(minor),
            })
            .collect();
        courses.sort_by(|a, b| b.enrollment_count.cmp(&a.enrollment_count));

        Ok(AnalyticsResponse {
            total_courses: courses.len(),
            total_enrollments: rows.len(),
            total_students,
            total_revenue: revenue(rows.iter().map(|row| &row.enrollment)),
            courses,
        })
    }

    // An enrollment whose student profile is gone has no identity to confirm
    // and is excluded along with those whose identity was deleted.
    async fn reconcile_enrollments(
        &self,
        rows: Vec<EnrollmentWithStudent>,
        source: &'static str,
    ) -> Reconciled<EnrollmentWithStudent> {
        let reconciled = self
            .reconciler
            .reconcile(rows, EnrollmentWithStudent::student_identity_id)
            .await;
        reconciled.report(source);
        reconciled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Enrollment, Profile, UserRecord};
    use crate::policy::reconcile::FailurePolicy;
    use crate::services::identity::MockIdentityProvider;
    use crate::services::store::MockProfileStore;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;

    fn enrollment(id: &str, profile_id: &str, amount: i64, minutes_ago: i64) -> Enrollment {
        Enrollment {
            enrollment_id: id.to_string(),
            profile_id: profile_id.to_string(),
            course_id: format!("course_{}", id),
            course_title: "Async Rust".to_string(),
            amount,
            payment_id: Some(format!("pay_{}", id)),
            enrolled_utc: Utc::now() - ChronoDuration::minutes(minutes_ago),
        }
    }

    fn setup() -> (Arc<MockIdentityProvider>, Arc<MockProfileStore>, AdminService) {
        let identity = Arc::new(MockIdentityProvider::new());
        let store = Arc::new(MockProfileStore::new());
        let reconciler = Reconciler::new(
            identity.clone(),
            Duration::from_millis(500),
            FailurePolicy::Prune,
        );
        let service = AdminService::new(store.clone(), reconciler);
        (identity, store, service)
    }

    #[tokio::test]
    async fn students_exclude_deleted_identities_and_count_enrollments() {
        let (identity, store, service) = setup();
        let alive = Profile::new("user_alive");
        let gone = Profile::new("user_gone");
        identity.add_user(UserRecord::new("user_alive", "alive@example.com"));
        store.insert_profile(alive.clone());
        store.insert_profile(gone.clone());
        store.insert_enrollment(enrollment("e1", &alive.profile_id, 4900, 3));
        store.insert_enrollment(enrollment("e2", &alive.profile_id, 9900, 2));
        store.insert_enrollment(enrollment("e3", &gone.profile_id, 4900, 1));

        let response = service.list_students().await.unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.excluded, 1);
        assert_eq!(response.students[0].identity_id, "user_alive");
        assert_eq!(response.students[0].enrollment_count, 2);
    }

    #[tokio::test]
    async fn enrollments_are_reconciled_and_revenue_summed() {
        let (identity, store, service) = setup();
        let alive = Profile::new("user_alive");
        let gone = Profile::new("user_gone");
        identity.add_user(UserRecord::new("user_alive", "alive@example.com"));
        store.insert_profile(alive.clone());
        store.insert_profile(gone.clone());
        store.insert_enrollment(enrollment("e1", &alive.profile_id, 4900, 3));
        store.insert_enrollment(enrollment("e2", &gone.profile_id, 1000, 2));
        store.insert_enrollment(enrollment("e3", &alive.profile_id, 9950, 1));
        store.insert_enrollment(enrollment("e4", "no_such_profile", 500, 0));

        let response = service.list_enrollments().await.unwrap();
        let ids: Vec<_> = response
            .enrollments
            .iter()
            .map(|e| e.enrollment_id.as_str())
            .collect();
        assert_eq!(ids, vec!["e3", "e1"]);
        assert_eq!(response.excluded, 2);
        assert!((response.total_revenue - 148.50).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn store_outage_is_an_error() {
        let (_identity, store, service) = setup();
        store.set_unavailable(true);
        assert!(service.list_students().await.is_err());
        assert!(service.list_enrollments().await.is_err());
    }

    #[tokio::test]
    async fn students_list_their_enrollments_newest_first() {
        let (identity, store, service) = setup();
        let mut alive = Profile::new("user_alive");
        alive.address = Some(crate::models::Address {
            city: "Lisbon".to_string(),
            ..Default::default()
        });
        identity.add_user(UserRecord::new("user_alive", "alive@example.com"));
        store.insert_profile(alive.clone());
        store.insert_enrollment(enrollment("e1", &alive.profile_id, 4900, 30));
        store.insert_enrollment(enrollment("e2", &alive.profile_id, 9900, 5));

        let response = service.list_students().await.unwrap();
        let student = &response.students[0];
        let ids: Vec<_> = student
            .enrollments
            .iter()
            .map(|e| e.enrollment_id.as_str())
            .collect();
        assert_eq!(ids, vec!["e2", "e1"]);
        assert_eq!(student.address.as_ref().unwrap().city, "Lisbon");
    }

    #[tokio::test]
    async fn course_details_are_reconciled() {
        let (identity, store, service) = setup();
        let alive = Profile::new("user_alive");
        let gone = Profile::new("user_gone");
        identity.add_user(UserRecord::new("user_alive", "alive@example.com"));
        store.insert_profile(alive.clone());
        store.insert_profile(gone.clone());

        for (id, profile_id, amount, course) in [
            ("e1", &alive.profile_id, 4900, "course_rust"),
            ("e2", &gone.profile_id, 4900, "course_rust"),
            ("e3", &alive.profile_id, 2500, "course_rust"),
            ("e4", &alive.profile_id, 9900, "course_go"),
        ] {
            let mut e = enrollment(id, profile_id, amount, 1);
            e.course_id = course.to_string();
            store.insert_enrollment(e);
        }

        let details = service.course_details("course_rust").await.unwrap();
        assert_eq!(details.course_id, "course_rust");
        assert_eq!(details.course_title, "Async Rust");
        assert_eq!(details.total_enrollments, 2);
        assert_eq!(details.excluded, 1);
        assert!((details.total_revenue - 74.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let (_identity, _store, service) = setup();
        let err = service.course_details("course_none").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn analytics_groups_by_course_without_identity_lookups() {
        let (identity, store, service) = setup();
        let a = Profile::new("user_a");
        let b = Profile::new("user_b");
        store.insert_profile(a.clone());
        store.insert_profile(b.clone());

        for (id, profile_id, amount, course) in [
            ("e1", &a.profile_id, 4900, "course_rust"),
            ("e2", &b.profile_id, 4900, "course_rust"),
            ("e3", &a.profile_id, 1250, "course_go"),
        ] {
            let mut e = enrollment(id, profile_id, amount, 1);
            e.course_id = course.to_string();
            store.insert_enrollment(e);
        }

        let analytics = service.analytics().await.unwrap();
        assert_eq!(analytics.total_courses, 2);
        assert_eq!(analytics.total_enrollments, 3);
        assert_eq!(analytics.total_students, 2);
        assert!((analytics.total_revenue - 110.5).abs() < f64::EPSILON);
        assert_eq!(analytics.courses[0].course_id, "course_rust");
        assert_eq!(analytics.courses[0].enrollment_count, 2);
        assert!((analytics.courses[0].total_revenue - 98.0).abs() < f64::EPSILON);
        assert_eq!(identity.get_user_calls(), 0);
    }

    #[tokio::test]
    async fn export_covers_only_reconciled_students() {
        let (identity, store, service) = setup();
        let mut alive = Profile::new("user_alive");
        alive.first_name = "Ada".to_string();
        let mut gone = Profile::new("user_gone");
        gone.first_name = "Ghost".to_string();
        identity.add_user(UserRecord::new("user_alive", "alive@example.com"));
        store.insert_profile(alive);
        store.insert_profile(gone);

        let csv = service.export_students().await.unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("\"Ada\""));
        assert!(!csv.contains("Ghost"));
    }
}
