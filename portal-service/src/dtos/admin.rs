use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Address, Enrollment, EnrollmentWithStudent, Profile};

/// One of a student's enrollments, as listed under the student.
#[derive(Debug, Serialize)]
pub struct StudentEnrollment {
    pub enrollment_id: String,
    pub course_id: String,
    pub course_title: String,
    pub amount: i64,
    pub enrolled_utc: DateTime<Utc>,
}

impl From<Enrollment> for StudentEnrollment {
    fn from(e: Enrollment) -> Self {
        Self {
            enrollment_id: e.enrollment_id,
            course_id: e.course_id,
            course_title: e.course_title,
            amount: e.amount,
            enrolled_utc: e.enrolled_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentSummary {
    pub profile_id: String,
    pub identity_id: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub onboarding_completed: bool,
    pub enrollment_count: usize,
    pub enrollments: Vec<StudentEnrollment>,
    pub created_utc: DateTime<Utc>,
}

impl StudentSummary {
    pub fn new(profile: Profile, enrollments: Vec<Enrollment>) -> Self {
        Self {
            name: profile.display_name(),
            profile_id: profile.profile_id,
            identity_id: profile.identity_id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            phone: profile.phone,
            image_url: profile.image_url,
            address: profile.address,
            onboarding_completed: profile.onboarding_completed,
            enrollment_count: enrollments.len(),
            enrollments: enrollments.into_iter().map(StudentEnrollment::from).collect(),
            created_utc: profile.created_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentsResponse {
    pub students: Vec<StudentSummary>,
    pub total: usize,
    /// Records hidden because their identity could not be confirmed.
    pub excluded: usize,
}

#[derive(Debug, Serialize)]
pub struct StudentRef {
    pub identity_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentSummary {
    pub enrollment_id: String,
    pub course_id: String,
    pub course_title: String,
    /// Minor currency units.
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub enrolled_utc: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentRef>,
}

impl From<EnrollmentWithStudent> for EnrollmentSummary {
    fn from(row: EnrollmentWithStudent) -> Self {
        let student = row.student.map(|s| StudentRef {
            name: s.display_name(),
            identity_id: s.identity_id,
            email: s.email,
        });
        let e = row.enrollment;
        Self {
            enrollment_id: e.enrollment_id,
            course_id: e.course_id,
            course_title: e.course_title,
            amount: e.amount,
            payment_id: e.payment_id,
            enrolled_utc: e.enrolled_utc,
            student,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrollmentsResponse {
    pub enrollments: Vec<EnrollmentSummary>,
    pub total: usize,
    /// Sum of amounts in major currency units.
    pub total_revenue: f64,
    pub excluded: usize,
}

/// One course's reconciled enrollments.
#[derive(Debug, Serialize)]
pub struct CourseDetailsResponse {
    pub course_id: String,
    pub course_title: String,
    pub enrollments: Vec<EnrollmentSummary>,
    pub total_enrollments: usize,
    /// Major currency units.
    pub total_revenue: f64,
    pub excluded: usize,
}

#[derive(Debug, Serialize)]
pub struct CourseStats {
    pub course_id: String,
    pub course_title: String,
    pub enrollment_count: usize,
    pub total_revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub courses: Vec<CourseStats>,
    pub total_courses: usize,
    pub total_enrollments: usize,
    pub total_students: usize,
    pub total_revenue: f64,
}
