//! Razorpay-related errors.

use thiserror::Error;

/// Errors that can occur when talking to Razorpay.
#[derive(Debug, Error)]
pub enum RazorpayError {
    /// HTTP request failed or timed out.
    #[error("Razorpay request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Razorpay response error: {0}")]
    Response(String),

    /// Razorpay returned an error body.
    #[error("Razorpay API error ({code}): {description}")]
    Api { code: String, description: String },

    /// Payment signature did not match.
    #[error("Invalid Razorpay signature: {0}")]
    InvalidSignature(String),

    /// Client could not be configured.
    #[error("Razorpay configuration error: {0}")]
    Config(String),
}
