//! Account error types.
//!
//! `Display` strings are shown to the user as flash messages, except for the
//! internal variants at the bottom.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No account with that username.
    #[error("Account not found")]
    AccountNotFound,

    /// The activation link has not been followed yet.
    #[error("Account not verified")]
    NotVerified,

    /// Wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Old password did not match on password change.
    #[error("Your old password was entered incorrectly")]
    IncorrectOldPassword,

    /// Username or email already registered.
    #[error("Account already exists")]
    AccountExists,

    /// Invalid email format.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// Invalid username format.
    #[error("{0}")]
    InvalidUsername(String),

    /// Password too weak.
    #[error("{0}")]
    WeakPassword(String),

    /// The two new passwords differ.
    #[error("The two password fields didn't match")]
    PasswordMismatch,

    /// Unknown or already used activation token.
    #[error("Invalid email token.")]
    InvalidToken,

    /// Profile requested for someone other than the signed-in user.
    #[error("Profile not found")]
    ProfileNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
