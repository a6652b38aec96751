use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Contact and postal address captured at checkout and snapshotted on the
/// order as both shipping and billing address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

pub const DEFAULT_COUNTRY: &str = "France";

impl Address {
    /// Checks required fields and the email shape.
    pub fn validate(&self) -> Result<(), &'static str> {
        let required = [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.address,
            &self.city,
            &self.postal_code,
            &self.country,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err("Please fill in all required fields");
        }
        if !is_valid_email(&self.email) {
            return Err("Please enter a valid email address");
        }
        Ok(())
    }
}

/// `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            first_name: "Camille".into(),
            last_name: "Martin".into(),
            email: "camille@example.fr".into(),
            phone: None,
            address: "12 rue de la Paix".into(),
            city: "Paris".into(),
            postal_code: "75002".into(),
            country: DEFAULT_COUNTRY.into(),
        }
    }

    #[test]
    fn complete_address_is_valid() {
        assert_eq!(address().validate(), Ok(()));
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let mut a = address();
        a.city = "   ".into();
        assert_eq!(a.validate(), Err("Please fill in all required fields"));
    }

    #[test]
    fn phone_is_optional() {
        let mut a = address();
        a.phone = Some(String::new());
        assert!(a.validate().is_ok());
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.fr"));
        assert!(!is_valid_email("a@@c.fr"));
        assert!(!is_valid_email("a@.fr"));
    }
}
