pub mod admin;
pub mod onboarding;
pub mod profile;

pub use admin::{
    AnalyticsResponse, CourseDetailsResponse, CourseStats, EnrollmentSummary, EnrollmentsResponse,
    StudentEnrollment, StudentRef, StudentSummary, StudentsResponse,
};
pub use onboarding::{AddressInput, OnboardingRequest, OnboardingResponse};
pub use profile::{DashboardResponse, EnrollmentView, ProfileView};
