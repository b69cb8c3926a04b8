use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dtos::profile::ProfileView;
use crate::models::Address;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OnboardingRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,

    #[serde(default)]
    pub address: Option<AddressInput>,
}

impl OnboardingRequest {
    /// Trim every field so whitespace-only input counts as blank.
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.map(AddressInput::normalized),
        }
    }

    /// The address to store, if any part of it was filled in.
    pub fn address(&self) -> Option<Address> {
        self.address
            .as_ref()
            .filter(|a| !a.is_blank())
            .map(|a| Address {
                street: a.street.clone(),
                city: a.city.clone(),
                state: a.state.clone(),
                postal_code: a.postal_code.clone(),
                country: a.country.clone(),
            })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressInput {
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

impl AddressInput {
    fn normalized(self) -> Self {
        Self {
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
        }
    }

    fn is_blank(&self) -> bool {
        [
            &self.street,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .all(|field| field.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub onboarding_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OnboardingRequest {
        OnboardingRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+44 20 7946 0000".to_string(),
            address: None,
        }
    }

    #[test]
    fn whitespace_only_fields_fail_validation() {
        let mut req = request();
        req.first_name = "   ".to_string();
        req.phone = "\t".to_string();

        let errors = req.normalized().validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("phone"));
        assert!(!fields.contains_key("last_name"));
    }

    #[test]
    fn blank_email_fails_validation() {
        let mut req = request();
        req.email = " ".to_string();
        assert!(req.normalized().validate().is_err());
    }

    #[test]
    fn blank_address_is_not_stored() {
        let mut req = request();
        req.address = Some(AddressInput {
            street: "  ".to_string(),
            ..Default::default()
        });
        assert_eq!(req.normalized().address(), None);
    }

    #[test]
    fn partial_address_is_stored_with_empty_fields() {
        let mut req = request();
        req.address = Some(AddressInput {
            city: " London ".to_string(),
            ..Default::default()
        });
        let address = req.normalized().address().unwrap();
        assert_eq!(address.city, "London");
        assert_eq!(address.street, "");
    }
}
