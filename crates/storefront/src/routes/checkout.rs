//! Checkout route handlers.
//!
//! `/checkout` makes sure the open cart has a Razorpay order and renders the
//! payment page; Razorpay's checkout widget then sends the browser to
//! `/success` with the signed payment details.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::cart::CheckoutRejection;

use super::PageContext;
use super::cart::CartView;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::flash::{self, FlashLevel};
use crate::middleware::RequireAuth;
use crate::services::payment::{PaymentCallback, PaymentOutcome};
use crate::services::{
    CheckoutError, CheckoutService, InvoiceService, PaymentError, PaymentService,
};
use crate::state::AppState;

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/pay.html")]
pub struct PayTemplate {
    pub page: PageContext,
    pub cart: CartView,
    pub key_id: String,
    pub order_id: String,
    pub amount_minor: i64,
    pub currency: &'static str,
    pub customer_email: String,
}

/// Payment confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub page: PageContext,
    pub order_id: String,
    pub already_paid: bool,
}

/// Start checkout for the open cart.
///
/// Refusals become flash messages: an empty cart goes back to the cart page
/// and a total below the minimum goes to the home page.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let config = state.config();
    let service = CheckoutService::new(
        state.pool(),
        state.razorpay(),
        config.checkout.minimum_amount,
    );

    let pending = match service.begin(&user).await {
        Ok(pending) => pending,
        Err(CheckoutError::Rejected(CheckoutRejection::EmptyCart)) => {
            flash::push(&session, FlashLevel::Info, "Your cart is empty.").await?;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(CheckoutError::Rejected(CheckoutRejection::AlreadyPaid)) => {
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(e @ CheckoutError::Rejected(CheckoutRejection::BelowMinimum { .. })) => {
            flash::push(&session, FlashLevel::Warning, e.to_string()).await?;
            return Ok(Redirect::to("/").into_response());
        }
        Err(e @ CheckoutError::CartChanged) => {
            flash::push(&session, FlashLevel::Warning, e.to_string()).await?;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    add_breadcrumb(
        "checkout",
        "Payment page",
        &[("order_id", pending.order_id.as_str())],
    );

    let currency = config.razorpay.currency;
    Ok(PayTemplate {
        cart: CartView::new(&pending.cart, currency),
        key_id: state.razorpay().key_id().to_string(),
        order_id: pending.order_id,
        amount_minor: pending.amount_minor,
        currency: currency.code(),
        customer_email: user.email.to_string(),
        page: PageContext::load(&session, Some(user)).await,
    }
    .into_response())
}

/// Razorpay return URL: verify the signature and mark the cart paid.
///
/// A cart edited after the order was created is sent back to the cart page.
#[instrument(skip(state, session, user, callback), fields(user_id = %user.id, order_id = %callback.order_id))]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(callback): Query<PaymentCallback>,
) -> Result<Response, AppError> {
    let outcome = match PaymentService::new(state.pool(), state.razorpay())
        .finalize(&user, &callback)
        .await
    {
        Ok(outcome) => outcome,
        Err(e @ PaymentError::CartChanged) => {
            flash::push(&session, FlashLevel::Warning, e.to_string()).await?;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(SuccessTemplate {
        already_paid: matches!(outcome, PaymentOutcome::AlreadyPaid(_)),
        order_id: callback.order_id,
        page: PageContext::load(&session, Some(user)).await,
    }
    .into_response())
}

/// Download the invoice for a paid order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<String>,
) -> Result<Response, AppError> {
    let config = state.config();
    let document = InvoiceService::new(
        state.pool(),
        &config.invoice_dir,
        config.razorpay.currency,
    )
    .generate(&user, &order_id)
    .await?;

    let disposition = format!("attachment; filename=\"{}\"", document.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response())
}
