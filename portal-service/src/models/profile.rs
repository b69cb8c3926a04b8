use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local learner record. `identity_id` is the only link to the identity
/// provider and may dangle once the upstream user is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub profile_id: String,
    pub identity_id: String,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

impl Profile {
    /// A fresh, not yet onboarded profile for `identity_id`.
    pub fn new(identity_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            profile_id: Uuid::new_v4().to_string(),
            identity_id: identity_id.into(),
            onboarding_completed: false,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            image_url: None,
            address: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// A paid (or free) course enrollment owned by a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub enrollment_id: String,
    pub profile_id: String,
    pub course_id: String,
    #[serde(default)]
    pub course_title: String,
    /// Amount paid in minor currency units.
    #[serde(default)]
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub enrolled_utc: DateTime<Utc>,
}

/// Enrollment joined with the owning profile, if it still exists locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentWithStudent {
    pub enrollment: Enrollment,
    #[serde(default)]
    pub student: Option<Profile>,
}

impl EnrollmentWithStudent {
    pub fn student_identity_id(&self) -> Option<&str> {
        self.student.as_ref().map(|s| s.identity_id.as_str())
    }
}
