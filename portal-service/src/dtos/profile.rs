use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Address, Enrollment, Profile};

/// JSON view of a profile. Storage keeps BSON dates; responses use RFC 3339.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub profile_id: String,
    pub identity_id: String,
    pub onboarding_completed: bool,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Profile> for ProfileView {
    fn from(p: Profile) -> Self {
        Self {
            profile_id: p.profile_id,
            identity_id: p.identity_id,
            onboarding_completed: p.onboarding_completed,
            first_name: p.first_name,
            last_name: p.last_name,
            email: p.email,
            phone: p.phone,
            image_url: p.image_url,
            address: p.address,
            created_utc: p.created_utc,
            updated_utc: p.updated_utc,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentView {
    pub enrollment_id: String,
    pub course_id: String,
    pub course_title: String,
    pub amount: i64,
    pub enrolled_utc: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentView {
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
pub struct DashboardResponse {
    pub profile: ProfileView,
    pub enrollments: Vec<EnrollmentView>,
}
