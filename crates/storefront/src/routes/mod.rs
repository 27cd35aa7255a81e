//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page (products, add-to-cart forms)
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (database)
//!
//! # Auth
//! GET  /login                     - Login page
//! POST /login                     - Login action
//! GET  /register                  - Register page
//! POST /register                  - Register action (sends activation email)
//! POST /logout                    - Logout action
//! GET  /activate/{token}          - Email verification
//!
//! # Cart (requires auth)
//! GET  /cart                      - Cart page
//! POST /cart                      - Apply coupon
//! GET  /cart/add/{product_id}     - Add item (?variant=&color=)
//! POST /cart/update-item          - Set quantity (JSON)
//! GET  /cart/remove/{item_id}     - Remove item
//! GET  /cart/remove-coupon/{id}   - Remove coupon
//!
//! # Checkout (requires auth)
//! GET  /checkout                  - Create Razorpay order, render payment page
//! GET  /success                   - Razorpay return URL
//! GET  /invoice/{order_id}        - Invoice PDF
//!
//! # Account (requires auth)
//! GET  /profile/{username}        - Profile, address, order history
//! POST /profile/{username}        - Update details or address
//! GET  /change-password           - Password form
//! POST /change-password           - Change password
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;

use axum::{
    Router,
    routing::{get, post},
};
use rust_decimal::Decimal;
use tower_sessions::Session;

use bazaar_core::{CurrencyCode, Money};

use crate::flash::{self, FlashMessage};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Data every full page needs: the signed-in user for the navigation bar
/// and the flash messages to show once.
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub messages: Vec<FlashMessage>,
}

impl PageContext {
    /// Take pending flash messages from the session.
    pub async fn load(session: &Session, user: Option<CurrentUser>) -> Self {
        Self {
            user,
            messages: flash::take(session).await,
        }
    }

    /// Username for the profile link, if signed in.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }
}

/// Amount with currency symbol for pages.
pub(crate) fn format_money(amount: Decimal, currency: CurrencyCode) -> String {
    Money::new(amount, currency).display()
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/activate/{token}", get(auth::activate))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::apply_coupon))
        .route("/add/{product_id}", get(cart::add))
        .route("/update-item", post(cart::update_item))
        .route("/remove/{item_id}", get(cart::remove))
        .route("/remove-coupon/{cart_id}", get(cart::remove_coupon))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile/{username}",
            get(account::profile).post(account::update_profile),
        )
        .route(
            "/change-password",
            get(account::change_password_page).post(account::change_password),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::checkout))
        .route("/success", get(checkout::success))
        .route("/invoice/{order_id}", get(checkout::invoice))
        .merge(auth_routes())
        .merge(account_routes())
}
