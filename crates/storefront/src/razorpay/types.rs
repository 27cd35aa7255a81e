//! Razorpay API request and response bodies.

use serde::{Deserialize, Serialize};

/// `POST /orders` body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// ISO 4217 code.
    pub currency: String,
    /// Merchant reference; the cart id.
    pub receipt: String,
    /// `1` captures the payment automatically.
    pub payment_capture: u8,
}

/// An order as returned by Razorpay.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
}

/// Error envelope: `{"error": {"code": ..., "description": ...}}`.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_request_body() {
        let body = CreateOrderRequest {
            amount: 9500,
            currency: "INR".to_string(),
            receipt: "cart_7".to_string(),
            payment_capture: 1,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "amount": 9500,
                "currency": "INR",
                "receipt": "cart_7",
                "payment_capture": 1
            })
        );
    }

    #[test]
    fn test_parse_order() {
        let order: Order = serde_json::from_str(
            r#"{"id":"order_Abc123","entity":"order","amount":9500,"amount_paid":0,
                "currency":"INR","receipt":"cart_7","status":"created","attempts":0}"#,
        )
        .unwrap();
        assert_eq!(order.id, "order_Abc123");
        assert_eq!(order.amount, 9500);
        assert_eq!(order.status, "created");
    }

    #[test]
    fn test_parse_error_body() {
        let body: ErrorResponse = serde_json::from_str(
            r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"Order amount less than minimum amount allowed"}}"#,
        )
        .unwrap();
        assert_eq!(body.error.code, "BAD_REQUEST_ERROR");
    }
}
