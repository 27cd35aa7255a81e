//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! # Pure tests (no services needed)
//! cargo test -p bazaar-integration-tests
//!
//! # Database tests: each gets a fresh database with the storefront migrations
//! DATABASE_URL=postgres://localhost/bazaar_test \
//!     cargo test -p bazaar-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_rules` - pricing, coupon and checkout rules through the public API
//! - `payment_signature` - Razorpay signature verification
//! - `cart_db` - cart, coupon and payment services against `PostgreSQL`
//! - `checkout_db` - checkout against `PostgreSQL` and a stub Razorpay server
//!
//! This library holds the fixtures those tests share.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::time::Duration;

use axum::Router;
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;

use bazaar_core::CurrencyCode;
use bazaar_storefront::config::RazorpayConfig;
use bazaar_storefront::db::CatalogRepository;
use bazaar_storefront::models::{CurrentUser, Product};
use bazaar_storefront::services::AuthService;
use bazaar_storefront::services::auth::RegisterInput;

/// Key secret shared by the fixtures and signature tests.
pub const TEST_KEY_SECRET: &str = "kq9Wz2LmP4vX7rT1";

/// Razorpay settings pointing at `api_base`.
#[must_use]
pub fn razorpay_config(api_base: &str) -> RazorpayConfig {
    RazorpayConfig {
        key_id: "rzp_test_key".to_string(),
        key_secret: SecretString::from(TEST_KEY_SECRET),
        api_base: api_base.to_string(),
        currency: CurrencyCode::INR,
        timeout: Duration::from_secs(5),
    }
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Parse a decimal literal.
#[must_use]
pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Register and activate an account, returning it as a session user.
pub async fn verified_user(pool: &PgPool, username: &str) -> CurrentUser {
    let auth = AuthService::new(pool);
    let registration = auth
        .register(&RegisterInput {
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: format!("{username}@bazaar.test"),
            password: "correct horse battery".to_string(),
        })
        .await
        .unwrap();
    auth.activate(&registration.email_token).await.unwrap();

    auth.login(username, "correct horse battery").await.unwrap()
}

/// Insert a product.
pub async fn product(pool: &PgPool, slug: &str, price: &str) -> Product {
    CatalogRepository::new(pool)
        .upsert_product(slug, slug, dec(price))
        .await
        .unwrap()
}
