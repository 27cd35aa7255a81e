//! Account service.
//!
//! Registration with email activation, password login, profile details and
//! password changes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, instrument};

use bazaar_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::{CurrentUser, NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum username length.
const MAX_USERNAME_LENGTH: usize = 150;

/// Random bytes in an email activation token.
const EMAIL_TOKEN_BYTES: usize = 32;

/// Registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// A freshly created account and the token its activation link carries.
#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub email_token: String,
}

/// Account service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register an unverified account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountExists` if the username or email is taken,
    /// or a validation error for a bad username, email or password.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: &RegisterInput) -> Result<Registration, AuthError> {
        let username = validate_username(&input.username)?;
        let email = Email::parse(&input.email)?;
        validate_password(&input.password)?;

        if self.users.exists(&username, &email).await? {
            return Err(AuthError::AccountExists);
        }

        let password_hash = hash_password(&input.password)?;
        let email_token = generate_email_token();

        let new_user = NewUser {
            username,
            email,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
        };

        // The existence check above races with concurrent registrations; the
        // unique indexes settle it.
        let user = self
            .users
            .create_with_profile(&new_user, &password_hash, &email_token)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::AccountExists,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, "Account registered");

        Ok(Registration { user, email_token })
    }

    /// Verify the email address holding `token`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if no unverified profile holds it.
    #[instrument(skip_all)]
    pub async fn activate(&self, token: &str) -> Result<UserId, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let user_id = self
            .users
            .verify_email_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        info!(user_id = %user_id, "Email verified");
        Ok(user_id)
    }

    /// Check a username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound`, `AuthError::NotVerified` or
    /// `AuthError::InvalidCredentials`, checked in that order.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let (user, password_hash) = self
            .users
            .get_with_password_hash(username.trim())
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !user.is_email_verified {
            return Err(AuthError::NotVerified);
        }

        verify_password(password, &password_hash)?;

        Ok(CurrentUser {
            id: user.id,
            username: user.username,
            email: user.email,
        })
    }

    /// The signed-in user's own account, looked up by the username in the URL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProfileNotFound` for any other username.
    pub async fn profile(&self, current: &CurrentUser, username: &str) -> Result<User, AuthError> {
        if current.username != username {
            return Err(AuthError::ProfileNotFound);
        }

        self.users
            .get_by_id(current.id)
            .await?
            .ok_or(AuthError::ProfileNotFound)
    }

    /// Update name and email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed email and
    /// `AuthError::AccountExists` if another account uses it.
    #[instrument(skip(self, current, first_name, last_name, email), fields(user_id = %current.id))]
    pub async fn update_details(
        &self,
        current: &CurrentUser,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        self.users
            .update_details(current.id, first_name.trim(), last_name.trim(), &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::AccountExists,
                other => AuthError::Repository(other),
            })
    }

    /// Replace the password after checking the old one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IncorrectOldPassword`, `AuthError::PasswordMismatch`
    /// or `AuthError::WeakPassword`.
    #[instrument(skip_all, fields(user_id = %current.id))]
    pub async fn change_password(
        &self,
        current: &CurrentUser,
        old_password: &str,
        new_password1: &str,
        new_password2: &str,
    ) -> Result<(), AuthError> {
        let stored = self.users.password_hash(current.id).await?;
        verify_password(old_password, &stored).map_err(|_| AuthError::IncorrectOldPassword)?;

        if new_password1 != new_password2 {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(new_password1)?;

        let password_hash = hash_password(new_password1)?;
        self.users
            .set_password_hash(current.id, &password_hash)
            .await?;

        info!("Password changed");
        Ok(())
    }
}

/// Generate an email activation token: 32 random bytes, URL-safe base64.
#[must_use]
pub fn generate_email_token() -> String {
    let mut bytes = [0u8; EMAIL_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn validate_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername(
            "Username is required".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "Username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AuthError::InvalidUsername(
            "Username may contain only letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(username.to_string())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_email_token_shape() {
        let token = generate_email_token();
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_email_tokens_unique() {
        let tokens: HashSet<String> = (0..200).map(|_| generate_email_token()).collect();
        assert_eq!(tokens.len(), 200);
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_against_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_length_rule() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("eightchr").is_ok());
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(validate_username("  asha_k ").unwrap(), "asha_k");
        assert!(validate_username("a.b+c-d@e").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("slash/name").is_err());
        assert!(validate_username(&"x".repeat(151)).is_err());
    }

    #[test]
    fn test_login_messages() {
        assert_eq!(AuthError::AccountNotFound.to_string(), "Account not found");
        assert_eq!(AuthError::NotVerified.to_string(), "Account not verified");
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(AuthError::InvalidToken.to_string(), "Invalid email token.");
    }
}
