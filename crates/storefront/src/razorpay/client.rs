//! Razorpay REST client.

use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, error, instrument};

use bazaar_core::CurrencyCode;

use super::error::RazorpayError;
use super::types::{CreateOrderRequest, ErrorResponse, Order};
use crate::config::RazorpayConfig;

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    /// HTTP client (carries the request timeout).
    client: Client,
    key_id: String,
    key_secret: SecretString,
    api_base: String,
    currency: CurrencyCode,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl RazorpayClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::Config` if the HTTP client cannot be built.
    pub fn new(config: &RazorpayConfig) -> Result<Self, RazorpayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RazorpayError::Config(e.to_string()))?;

        Ok(Self {
            client,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            api_base: config.api_base.clone(),
            currency: config.currency,
        })
    }

    /// Currency orders are created in.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Public key id for the browser checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create an order. Single attempt; no retries.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::Request` on transport failure or timeout,
    /// `RazorpayError::Api` if Razorpay rejects the order, and
    /// `RazorpayError::Response` if the body cannot be parsed.
    #[instrument(skip(self, request), fields(amount = request.amount, receipt = %request.receipt))]
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, RazorpayError> {
        let response = self
            .client
            .post(format!("{}/orders", self.api_base))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(request)
            .send()
            .await
            .map_err(|e| RazorpayError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RazorpayError::Response(e.to_string()))?;

        if !status.is_success() {
            let (code, description) = serde_json::from_str::<ErrorResponse>(&body).map_or_else(
                |_| (status.as_u16().to_string(), body.clone()),
                |e| (e.error.code, e.error.description),
            );
            error!(%status, code = %code, "Razorpay rejected order");
            return Err(RazorpayError::Api { code, description });
        }

        let order: Order =
            serde_json::from_str(&body).map_err(|e| RazorpayError::Response(e.to_string()))?;

        debug!(order_id = %order.id, status = %order.status, "Razorpay order created");

        Ok(order)
    }

    /// Verify the signature Razorpay attaches to a successful payment.
    ///
    /// The signature is `hex(HMAC-SHA256(key_secret, "{order_id}|{payment_id}"))`
    /// and is compared in constant time.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidSignature` if it does not match.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), RazorpayError> {
        let provided = hex::decode(signature.trim())
            .map_err(|_| RazorpayError::InvalidSignature("not hex".to_string()))?;

        let mut mac = new_mac(&self.key_secret)?;
        mac.update(signed_payload(order_id, payment_id).as_bytes());

        mac.verify_slice(&provided)
            .map_err(|_| RazorpayError::InvalidSignature("signature mismatch".to_string()))?;

        debug!(order_id, "Razorpay signature verified");
        Ok(())
    }
}

fn signed_payload(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}|{payment_id}")
}

fn new_mac(secret: &SecretString) -> Result<Hmac<Sha256>, RazorpayError> {
    Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| RazorpayError::Config(e.to_string()))
}

/// Compute the signature Razorpay would send for a payment.
///
/// Used by tests and by local tooling that simulates the checkout return.
///
/// # Errors
///
/// Returns `RazorpayError::Config` if the key cannot be used as an HMAC key.
pub fn payment_signature(
    key_secret: &SecretString,
    order_id: &str,
    payment_id: &str,
) -> Result<String, RazorpayError> {
    let mut mac = new_mac(key_secret)?;
    mac.update(signed_payload(order_id, payment_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
