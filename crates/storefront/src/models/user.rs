//! User domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{Email, UserId};

/// A storefront account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// Whether the activation link has been followed.
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", trimmed; falls back to the username when both are blank.
    #[must_use]
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }
}

/// Validated registration data.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: UserId::new(1),
            username: "asha".to_string(),
            email: Email::parse("asha@mail.test").unwrap(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            is_email_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(user("Asha", "Rao").full_name(), "Asha Rao");
        assert_eq!(user("Asha", "").full_name(), "Asha");
        assert_eq!(user(" ", "").full_name(), "asha");
    }
}
