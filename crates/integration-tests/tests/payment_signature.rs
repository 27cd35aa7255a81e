//! Razorpay payment signature verification.
//!
//! No services needed.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;

use bazaar_integration_tests::{TEST_KEY_SECRET, razorpay_config};
use bazaar_storefront::razorpay::{RazorpayClient, RazorpayError, payment_signature};

fn client() -> RazorpayClient {
    RazorpayClient::new(&razorpay_config("http://127.0.0.1:9")).unwrap()
}

#[test]
fn test_known_signature_vector() {
    let signature = payment_signature(
        &SecretString::from("secret"),
        "order_IluGWxBm9U8zJ8",
        "pay_IluH9JJ4nRNSEq",
    )
    .unwrap();

    assert_eq!(
        signature,
        "9f8c30bdf9379e12c0809c1a8ffdfbbc6e54e1cbc2a978774a10c611f69fe093"
    );
}

#[test]
fn test_provider_signature_accepted() {
    let signature = payment_signature(
        &SecretString::from(TEST_KEY_SECRET),
        "order_Abc123",
        "pay_Xyz789",
    )
    .unwrap();

    assert!(
        client()
            .verify_payment_signature("order_Abc123", "pay_Xyz789", &signature)
            .is_ok()
    );
}

#[test]
fn test_tampered_ids_rejected() {
    let signature = payment_signature(
        &SecretString::from(TEST_KEY_SECRET),
        "order_Abc123",
        "pay_Xyz789",
    )
    .unwrap();
    let client = client();

    for (order_id, payment_id) in [
        ("order_Abc124", "pay_Xyz789"),
        ("order_Abc123", "pay_Xyz780"),
        ("pay_Xyz789", "order_Abc123"),
    ] {
        let err = client
            .verify_payment_signature(order_id, payment_id, &signature)
            .unwrap_err();
        assert!(matches!(err, RazorpayError::InvalidSignature(_)), "{err}");
    }
}

#[test]
fn test_signature_from_other_key_rejected() {
    let signature = payment_signature(
        &SecretString::from("another-merchant-secret"),
        "order_Abc123",
        "pay_Xyz789",
    )
    .unwrap();

    assert!(
        client()
            .verify_payment_signature("order_Abc123", "pay_Xyz789", &signature)
            .is_err()
    );
}
