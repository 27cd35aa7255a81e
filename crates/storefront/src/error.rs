//! Unified error handling with Sentry integration.
//!
//! Every handler error becomes an `AppError`. Its [`ErrorKind`] picks the
//! status code and decides whether the error is reported to Sentry; the
//! client only ever sees [`AppError::user_message`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bazaar_core::cart::CheckoutRejection;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CartError, CheckoutError, InvoiceError, PaymentError};

/// Coarse error classes shown to users and used for status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    ExternalService,
    Authentication,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::ExternalService => "external_service",
            Self::Authentication => "authentication",
            Self::Internal => "internal",
        }
    }

    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::ExternalService => StatusCode::BAD_GATEWAY,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether errors of this kind are our fault and worth reporting.
    #[must_use]
    pub const fn is_server_error(self) -> bool {
        matches!(self, Self::ExternalService | Self::Internal)
    }
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Invoice error: {0}")]
    Invoice(#[from] InvoiceError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    Validation(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth(err) => match err {
                AuthError::AccountNotFound
                | AuthError::NotVerified
                | AuthError::InvalidCredentials
                | AuthError::IncorrectOldPassword => ErrorKind::Authentication,
                AuthError::AccountExists
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidUsername(_)
                | AuthError::WeakPassword(_)
                | AuthError::PasswordMismatch => ErrorKind::Validation,
                AuthError::InvalidToken | AuthError::ProfileNotFound => ErrorKind::NotFound,
                AuthError::Repository(_) | AuthError::PasswordHash => ErrorKind::Internal,
            },
            Self::Cart(err) => match err {
                CartError::ProductNotFound
                | CartError::SizeVariantNotFound
                | CartError::ColorVariantNotFound
                | CartError::ItemNotFound
                | CartError::CartNotFound => ErrorKind::NotFound,
                CartError::InvalidQuantity | CartError::Coupon(_) => ErrorKind::Validation,
                CartError::Repository(_) => ErrorKind::Internal,
            },
            Self::Checkout(err) => match err {
                CheckoutError::Rejected(CheckoutRejection::Amount(_))
                | CheckoutError::Repository(_) => ErrorKind::Internal,
                CheckoutError::Rejected(_) | CheckoutError::CartChanged => ErrorKind::Validation,
                CheckoutError::Provider(_) => ErrorKind::ExternalService,
            },
            Self::Payment(err) => match err {
                PaymentError::OrderNotFound => ErrorKind::NotFound,
                PaymentError::InvalidSignature(_) => ErrorKind::Authentication,
                PaymentError::CartChanged => ErrorKind::Validation,
                PaymentError::Repository(_) => ErrorKind::Internal,
            },
            Self::Invoice(err) => match err {
                InvoiceError::CartNotFound => ErrorKind::NotFound,
                InvoiceError::NotPaid => ErrorKind::Validation,
                InvoiceError::Render(_) | InvoiceError::Io(_) | InvoiceError::Repository(_) => {
                    ErrorKind::Internal
                }
            },
        }
    }

    /// Text safe to show the user.
    ///
    /// Server-side kinds get a generic message; for the rest the service
    /// error's own message is already written for the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Something went wrong. Please try again.".to_string(),
            ErrorKind::ExternalService => {
                "The payment service is unavailable. Please try again later.".to_string()
            }
            ErrorKind::NotFound | ErrorKind::Validation | ErrorKind::Authentication => {
                match self {
                    Self::Auth(err) => err.to_string(),
                    Self::Cart(err) => err.to_string(),
                    Self::Checkout(err) => err.to_string(),
                    Self::Payment(err) => err.to_string(),
                    Self::Invoice(err) => err.to_string(),
                    Self::NotFound(_) | Self::Database(_) => "Not found".to_string(),
                    Self::Validation(msg) => msg.clone(),
                    Self::Session(_) | Self::Internal(_) => String::new(),
                }
            }
        }
    }

    /// Log the error with its kind; report server-side kinds to Sentry.
    pub fn report(&self) {
        let kind = self.kind();
        if kind.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                error_kind = kind.as_str(),
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, error_kind = kind.as_str(), "Request rejected");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();
        (self.kind().status(), self.user_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
