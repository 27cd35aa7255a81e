//! Cart, coupon, account and payment services against `PostgreSQL`.
//!
//! Each test gets a fresh database with the storefront migrations applied.
//! Run with `DATABASE_URL` set and `--include-ignored`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use secrecy::SecretString;
use sqlx::PgPool;

use bazaar_core::cart::{CouponRejection, CouponTerms, DiscountRule};
use bazaar_core::{CartItemId, CurrencyCode};
use bazaar_integration_tests::{TEST_KEY_SECRET, dec, product, razorpay_config, verified_user};
use bazaar_storefront::db::{CartRepository, CatalogRepository, CouponRepository};
use bazaar_storefront::models::CurrentUser;
use bazaar_storefront::razorpay::{RazorpayClient, payment_signature};
use bazaar_storefront::services::auth::RegisterInput;
use bazaar_storefront::services::cart::QuantityInput;
use bazaar_storefront::services::payment::{PaymentCallback, PaymentOutcome};
use bazaar_storefront::services::{
    AuthError, AuthService, CartError, CartService, InvoiceError, InvoiceService, PaymentError,
    PaymentService,
};

async fn coupon(pool: &PgPool, code: &str, minimum: &str, flat: &str) {
    CouponRepository::new(pool)
        .upsert(
            code,
            &CouponTerms {
                minimum_amount: dec(minimum),
                is_expired: false,
                expires_at: None,
                rule: DiscountRule::flat(dec(flat)),
            },
        )
        .await
        .unwrap();
}

/// A user with a 40.00 and a 65.00 item in the open cart.
async fn shopper(pool: &PgPool, username: &str) -> CurrentUser {
    let user = verified_user(pool, username).await;
    let shirt = product(pool, "shirt", "40.00").await;
    let cap = product(pool, "cap", "65.00").await;

    let cart = CartService::new(pool);
    cart.add_item(&user, shirt.id, None, None).await.unwrap();
    cart.add_item(&user, cap.id, None, None).await.unwrap();
    user
}

fn razorpay() -> RazorpayClient {
    RazorpayClient::new(&razorpay_config("http://127.0.0.1:9")).unwrap()
}

/// Give the user's open cart a provider order, as checkout would.
async fn awaiting_payment(pool: &PgPool, user: &CurrentUser, order_id: &str) {
    let carts = CartRepository::new(pool);
    let cart = carts.open_cart(user.id).await.unwrap().unwrap();
    carts
        .set_provider_order(cart.id, None, order_id, 10500)
        .await
        .unwrap();
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT count(*) FROM storefront.{table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn order_dropped(carts: &CartRepository<'_>, user: &CurrentUser) -> bool {
    let cart = carts.open_cart(user.id).await.unwrap().unwrap();
    cart.razorpay_order_id.is_none() && cart.checkout_amount_paise.is_none()
}

fn callback(order_id: &str, payment_id: &str) -> PaymentCallback {
    PaymentCallback {
        order_id: order_id.to_string(),
        razorpay_payment_id: payment_id.to_string(),
        razorpay_signature: payment_signature(
            &SecretString::from(TEST_KEY_SECRET),
            order_id,
            payment_id,
        )
        .unwrap(),
    }
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_items_share_one_open_cart(pool: PgPool) {
    let user = shopper(&pool, "asha").await;

    let cart = CartService::new(&pool).open_cart(&user).await.unwrap().unwrap();
    assert_eq!(cart.lines.len(), 2);
    assert_eq!(cart.totals.subtotal, dec("105.00"));

    let open: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM storefront.cart WHERE user_id = $1 AND NOT is_paid",
    )
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(open, 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_coupon_applies_once(pool: PgPool) {
    let user = shopper(&pool, "asha").await;
    coupon(&pool, "TEN", "50.00", "10.00").await;
    coupon(&pool, "BIG", "200.00", "10.00").await;
    let service = CartService::new(&pool);

    service.apply_coupon(&user, "TEN").await.unwrap();
    let cart = service.open_cart(&user).await.unwrap().unwrap();
    assert_eq!(cart.totals.total, dec("95.00"));

    let err = service.apply_coupon(&user, "BIG").await.unwrap_err();
    assert!(matches!(err, CartError::Coupon(CouponRejection::AlreadyApplied)));
    let cart = service.open_cart(&user).await.unwrap().unwrap();
    assert_eq!(cart.coupon.unwrap().code, "TEN");

    service.remove_coupon(&user, cart.cart.id).await.unwrap();
    let err = service.apply_coupon(&user, "BIG").await.unwrap_err();
    assert!(matches!(
        err,
        CartError::Coupon(CouponRejection::BelowMinimum { .. })
    ));
    let cart = service.open_cart(&user).await.unwrap().unwrap();
    assert!(cart.coupon.is_none());
    assert_eq!(cart.totals.total, dec("105.00"));

    let err = service.apply_coupon(&user, "NOPE").await.unwrap_err();
    assert!(matches!(err, CartError::Coupon(CouponRejection::UnknownCode)));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_quantity_update_scoped_to_owner(pool: PgPool) {
    let owner = shopper(&pool, "asha").await;
    let other = verified_user(&pool, "ravi").await;
    let service = CartService::new(&pool);

    let item_id: CartItemId = service.open_cart(&owner).await.unwrap().unwrap().lines[0].item_id;

    let err = service
        .update_item_quantity(&other, item_id, &QuantityInput::Text("5".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::ItemNotFound));

    let err = service
        .update_item_quantity(&owner, item_id, &QuantityInput::Text("0".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::InvalidQuantity));

    let cart = service.open_cart(&owner).await.unwrap().unwrap();
    assert_eq!(cart.lines[0].quantity, 1);

    service
        .update_item_quantity(&owner, item_id, &QuantityInput::Text("3".to_string()))
        .await
        .unwrap();
    let cart = service.open_cart(&owner).await.unwrap().unwrap();
    assert_eq!(cart.lines[0].quantity, 3);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_unknown_order_changes_nothing(pool: PgPool) {
    let user = shopper(&pool, "asha").await;
    awaiting_payment(&pool, &user, "order_real").await;
    let razorpay = razorpay();

    let err = PaymentService::new(&pool, &razorpay)
        .finalize(&user, &callback("order_forged", "pay_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::OrderNotFound));

    let cart = CartRepository::new(&pool).open_cart(user.id).await.unwrap();
    assert!(cart.is_some_and(|c| !c.is_paid));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_payment_verified_then_idempotent(pool: PgPool) {
    let user = shopper(&pool, "asha").await;
    awaiting_payment(&pool, &user, "order_real").await;
    let razorpay = razorpay();
    let payments = PaymentService::new(&pool, &razorpay);

    let mut forged = callback("order_real", "pay_1");
    forged.razorpay_signature = "00".repeat(32);
    let err = payments.finalize(&user, &forged).await.unwrap_err();
    assert!(matches!(err, PaymentError::InvalidSignature(_)));
    assert!(CartRepository::new(&pool).open_cart(user.id).await.unwrap().is_some());

    let first = payments
        .finalize(&user, &callback("order_real", "pay_1"))
        .await
        .unwrap();
    assert!(matches!(first, PaymentOutcome::Paid(_)));

    let again = payments
        .finalize(&user, &callback("order_real", "pay_1"))
        .await
        .unwrap();
    assert!(matches!(again, PaymentOutcome::AlreadyPaid(_)));

    assert!(CartRepository::new(&pool).open_cart(user.id).await.unwrap().is_none());
    let paid = CartService::new(&pool).paid_orders(&user).await.unwrap();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].cart.razorpay_payment_id.as_deref(), Some("pay_1"));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_payment_for_other_users_order_not_found(pool: PgPool) {
    let owner = shopper(&pool, "asha").await;
    let other = verified_user(&pool, "ravi").await;
    awaiting_payment(&pool, &owner, "order_real").await;
    let razorpay = razorpay();

    let err = PaymentService::new(&pool, &razorpay)
        .finalize(&other, &callback("order_real", "pay_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::OrderNotFound));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_invoice_only_for_paid_cart(pool: PgPool) {
    let user = shopper(&pool, "asha").await;
    awaiting_payment(&pool, &user, "order_real").await;
    let dir = std::env::temp_dir().join(format!("bazaar-invoices-{}", user.id));
    let invoices = InvoiceService::new(&pool, &dir, CurrencyCode::INR);

    let err = invoices.generate(&user, "order_real").await.unwrap_err();
    assert!(matches!(err, InvoiceError::NotPaid));

    let razorpay = razorpay();
    PaymentService::new(&pool, &razorpay)
        .finalize(&user, &callback("order_real", "pay_1"))
        .await
        .unwrap();

    let document = invoices.generate(&user, "order_real").await.unwrap();
    assert_eq!(document.file_name, "invoice_order_real.pdf");
    assert!(document.bytes.starts_with(b"%PDF-1.4"));
    assert_eq!(tokio::fs::read(&document.path).await.unwrap(), document.bytes);

    tokio::fs::remove_dir_all(&dir).await.ok();
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_login_failures_in_order(pool: PgPool) {
    let auth = AuthService::new(&pool);
    let input = RegisterInput {
        username: "meera".to_string(),
        first_name: "Meera".to_string(),
        last_name: "Iyer".to_string(),
        email: "meera@bazaar.test".to_string(),
        password: "correct horse battery".to_string(),
    };
    let registration = auth.register(&input).await.unwrap();

    assert!(matches!(
        auth.login("nobody", "whatever").await.unwrap_err(),
        AuthError::AccountNotFound
    ));
    assert!(matches!(
        auth.login("meera", "correct horse battery").await.unwrap_err(),
        AuthError::NotVerified
    ));

    auth.activate(&registration.email_token).await.unwrap();
    assert!(matches!(
        auth.activate(&registration.email_token).await.unwrap_err(),
        AuthError::InvalidToken
    ));

    assert!(matches!(
        auth.login("meera", "wrong password").await.unwrap_err(),
        AuthError::InvalidCredentials
    ));
    assert_eq!(auth.login("meera", "correct horse battery").await.unwrap().username, "meera");

    assert!(matches!(
        auth.register(&input).await.unwrap_err(),
        AuthError::AccountExists
    ));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cart_edit_drops_provider_order(pool: PgPool) {
    let user = verified_user(&pool, "asha").await;
    let shirt = product(&pool, "shirt", "40.00").await;
    coupon(&pool, "TEN", "0", "10.00").await;
    let service = CartService::new(&pool);
    let carts = CartRepository::new(&pool);

    let item_id = service.add_item(&user, shirt.id, None, None).await.unwrap();
    let cart_id = carts.open_cart(user.id).await.unwrap().unwrap().id;

    carts.set_provider_order(cart_id, None, "order_1", 4000).await.unwrap();
    service.add_item(&user, shirt.id, None, None).await.unwrap();
    assert!(order_dropped(&carts, &user).await);

    // The old order can no longer pay for the changed cart.
    let razorpay = razorpay();
    let err = PaymentService::new(&pool, &razorpay)
        .finalize(&user, &callback("order_1", "pay_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::OrderNotFound));
    assert!(carts.open_cart(user.id).await.unwrap().is_some_and(|c| !c.is_paid));

    carts.set_provider_order(cart_id, None, "order_2", 8000).await.unwrap();
    service
        .update_item_quantity(&user, item_id, &QuantityInput::Text("2".to_string()))
        .await
        .unwrap();
    assert!(order_dropped(&carts, &user).await);

    carts.set_provider_order(cart_id, None, "order_3", 12000).await.unwrap();
    service.apply_coupon(&user, "TEN").await.unwrap();
    assert!(order_dropped(&carts, &user).await);

    carts.set_provider_order(cart_id, None, "order_4", 11000).await.unwrap();
    service.remove_coupon(&user, cart_id).await.unwrap();
    assert!(order_dropped(&carts, &user).await);

    carts.set_provider_order(cart_id, None, "order_5", 12000).await.unwrap();
    service.remove_item(&user, item_id).await.unwrap();
    assert!(order_dropped(&carts, &user).await);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_payment_refused_when_total_differs_from_order(pool: PgPool) {
    let user = shopper(&pool, "asha").await;
    let carts = CartRepository::new(&pool);
    let cart = carts.open_cart(user.id).await.unwrap().unwrap();
    // The cart totals 105.00 but the order was created for 40.00.
    carts.set_provider_order(cart.id, None, "order_short", 4000).await.unwrap();
    let razorpay = razorpay();

    let err = PaymentService::new(&pool, &razorpay)
        .finalize(&user, &callback("order_short", "pay_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::CartChanged));

    let cart = carts.open_cart(user.id).await.unwrap().unwrap();
    assert!(!cart.is_paid);
    assert!(cart.razorpay_payment_id.is_none());
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_unknown_variant_leaves_no_cart(pool: PgPool) {
    let user = verified_user(&pool, "asha").await;
    let shirt = product(&pool, "shirt", "40.00").await;
    let catalog = CatalogRepository::new(&pool);
    catalog.upsert_size_variant("M", None).await.unwrap();
    catalog.upsert_color_variant("Red", None).await.unwrap();
    let service = CartService::new(&pool);

    let err = service
        .add_item(&user, shirt.id, Some("XXL"), Some("Red"))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::SizeVariantNotFound));

    let err = service
        .add_item(&user, shirt.id, Some("M"), Some("Mauve"))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::ColorVariantNotFound));

    assert_eq!(count(&pool, "cart").await, 0);
    assert_eq!(count(&pool, "cart_item").await, 0);

    service
        .add_item(&user, shirt.id, Some("M"), Some("Red"))
        .await
        .unwrap();
    let cart = service.open_cart(&user).await.unwrap().unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].size_name.as_deref(), Some("M"));
    assert_eq!(cart.lines[0].color_name.as_deref(), Some("Red"));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_removals_scoped_to_owner(pool: PgPool) {
    let owner = shopper(&pool, "asha").await;
    let other = verified_user(&pool, "ravi").await;
    coupon(&pool, "TEN", "50.00", "10.00").await;
    let service = CartService::new(&pool);
    service.apply_coupon(&owner, "TEN").await.unwrap();

    let before = service.open_cart(&owner).await.unwrap().unwrap();
    let item_id = before.lines[0].item_id;

    let err = service.remove_item(&other, item_id).await.unwrap_err();
    assert!(matches!(err, CartError::ItemNotFound));

    let err = service.remove_coupon(&other, before.cart.id).await.unwrap_err();
    assert!(matches!(err, CartError::CartNotFound));

    let after = service.open_cart(&owner).await.unwrap().unwrap();
    assert_eq!(after.lines.len(), 2);
    assert_eq!(after.coupon.unwrap().code, "TEN");
    assert_eq!(after.totals.total, dec("95.00"));
}
