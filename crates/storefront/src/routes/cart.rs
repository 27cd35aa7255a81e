//! Cart route handlers.
//!
//! Page actions (add, remove, coupons) answer with a flash message and a
//! redirect back. Quantity changes come from the cart page script as JSON.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{CartId, CartItemId, CurrencyCode, ProductId};

use super::{PageContext, format_money};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::flash::{self, FlashLevel, redirect_back, warn_and_redirect};
use crate::middleware::RequireAuth;
use crate::models::PricedCart;
use crate::services::CartService;
use crate::services::cart::QuantityInput;
use crate::state::AppState;

const CART_PATH: &str = "/cart";

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: i32,
    pub name: String,
    pub variant: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub id: i32,
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub coupon_code: Option<String>,
    pub subtotal: String,
    pub discount: String,
    pub total: String,
}

impl CartView {
    pub(crate) fn new(cart: &PricedCart, currency: CurrencyCode) -> Self {
        Self {
            id: cart.cart.id.as_i32(),
            items: cart
                .lines
                .iter()
                .map(|line| CartItemView {
                    id: line.item_id.as_i32(),
                    name: line.product_name.clone(),
                    variant: line.variant_label(),
                    quantity: line.quantity,
                    price: format_money(line.unit_price, currency),
                    line_price: format_money(line.line_total(), currency),
                })
                .collect(),
            item_count: cart.lines.iter().map(|l| l.quantity).sum(),
            coupon_code: cart.coupon.as_ref().map(|c| c.code.clone()),
            subtotal: format_money(cart.totals.subtotal, currency),
            discount: format_money(cart.totals.discount, currency),
            total: format_money(cart.totals.total, currency),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: Option<CartView>,
}

// =============================================================================
// Form and query types
// =============================================================================

/// Variant names chosen on the product list.
#[derive(Debug, Deserialize)]
pub struct AddQuery {
    pub variant: Option<String>,
    pub color: Option<String>,
}

/// Coupon form on the cart page.
#[derive(Debug, Deserialize)]
pub struct CouponForm {
    pub coupon: String,
}

/// An item id as sent by the cart page: a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ItemIdInput {
    Number(i32),
    Text(String),
}

impl ItemIdInput {
    fn to_id(&self) -> Option<CartItemId> {
        match self {
            Self::Number(id) => Some(CartItemId::new(*id)),
            Self::Text(s) => s.trim().parse().ok().map(CartItemId::new),
        }
    }
}

/// Body of `POST /cart/update-item`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub cart_item_id: ItemIdInput,
    pub quantity: QuantityInput,
}

/// Reply to `POST /cart/update-item`.
#[derive(Debug, Default, Serialize)]
pub struct UpdateItemResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
}

impl UpdateItemResponse {
    fn failed(err: &AppError) -> Response {
        err.report();
        let body = Self {
            success: false,
            error: Some(err.user_message()),
            ..Self::default()
        };
        (err.kind().status(), Json(body)).into_response()
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Display the cart page.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let cart = CartService::new(state.pool()).open_cart(&user).await?;
    let currency = state.config().razorpay.currency;

    Ok(CartShowTemplate {
        cart: cart.as_ref().map(|c| CartView::new(c, currency)),
        page: PageContext::load(&session, Some(user)).await,
    })
}

/// Add a product to the open cart, creating the cart if needed.
#[instrument(skip(state, session, headers, user, query), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<i32>,
    Query(query): Query<AddQuery>,
) -> Result<Redirect, AppError> {
    let base_url = &state.config().base_url;

    let result = CartService::new(state.pool())
        .add_item(
            &user,
            ProductId::new(product_id),
            query.variant.as_deref(),
            query.color.as_deref(),
        )
        .await;

    match result {
        Ok(item_id) => {
            add_breadcrumb(
                "cart",
                "Add item",
                &[("item_id", item_id.to_string().as_str())],
            );
            flash::push(&session, FlashLevel::Success, "Item added to cart successfully.").await?;
            Ok(redirect_back(&headers, base_url, "/"))
        }
        Err(e) => warn_and_redirect(&session, &AppError::from(e), &headers, base_url, "/").await,
    }
}

/// Apply a coupon code to the open cart.
#[instrument(skip(state, session, headers, user, form), fields(user_id = %user.id))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CouponForm>,
) -> Result<Redirect, AppError> {
    let base_url = &state.config().base_url;

    match CartService::new(state.pool())
        .apply_coupon(&user, &form.coupon)
        .await
    {
        Ok(_) => {
            flash::push(&session, FlashLevel::Success, "Coupon applied successfully.").await?;
            Ok(redirect_back(&headers, base_url, CART_PATH))
        }
        Err(e) => {
            warn_and_redirect(&session, &AppError::from(e), &headers, base_url, CART_PATH).await
        }
    }
}

/// Unpack the update request; any malformed body gets the JSON failure reply.
fn parse_update(
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<(CartItemId, QuantityInput), Response> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected update-item body");
        UpdateItemResponse::failed(&AppError::Validation("Invalid request".to_string()))
    })?;

    let item_id = body.cart_item_id.to_id().ok_or_else(|| {
        UpdateItemResponse::failed(&AppError::Validation("Invalid cart item".to_string()))
    })?;

    Ok((item_id, body.quantity))
}

/// Set the quantity of an item in the open cart.
///
/// Replies with the new totals so the page can update without a reload.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Response {
    let (item_id, quantity) = match parse_update(payload) {
        Ok(parsed) => parsed,
        Err(reply) => return reply,
    };

    let service = CartService::new(state.pool());

    let quantity = match service
        .update_item_quantity(&user, item_id, &quantity)
        .await
    {
        Ok(quantity) => quantity,
        Err(e) => return UpdateItemResponse::failed(&AppError::from(e)),
    };

    let currency = state.config().razorpay.currency;
    let totals = match service.open_cart(&user).await {
        Ok(cart) => cart.map(|c| c.totals),
        Err(e) => return UpdateItemResponse::failed(&AppError::from(e)),
    };

    let body = UpdateItemResponse {
        success: true,
        quantity: Some(quantity),
        subtotal: totals.map(|t| format_money(t.subtotal, currency)),
        discount: totals.map(|t| format_money(t.discount, currency)),
        total: totals.map(|t| format_money(t.total, currency)),
        ..UpdateItemResponse::default()
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Remove an item from the open cart.
#[instrument(skip(state, session, headers, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let base_url = &state.config().base_url;

    match CartService::new(state.pool())
        .remove_item(&user, CartItemId::new(item_id))
        .await
    {
        Ok(()) => {
            flash::push(&session, FlashLevel::Success, "Item removed from cart.").await?;
            Ok(redirect_back(&headers, base_url, CART_PATH))
        }
        Err(e) => {
            warn_and_redirect(&session, &AppError::from(e), &headers, base_url, CART_PATH).await
        }
    }
}

/// Detach the coupon from the open cart.
#[instrument(skip(state, session, headers, user), fields(user_id = %user.id))]
pub async fn remove_coupon(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Path(cart_id): Path<i32>,
) -> Result<Redirect, AppError> {
    let base_url = &state.config().base_url;

    match CartService::new(state.pool())
        .remove_coupon(&user, CartId::new(cart_id))
        .await
    {
        Ok(()) => {
            flash::push(&session, FlashLevel::Success, "Coupon Removed.").await?;
            Ok(redirect_back(&headers, base_url, CART_PATH))
        }
        Err(e) => {
            warn_and_redirect(&session, &AppError::from(e), &headers, base_url, CART_PATH).await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::extract::FromRequest;
    use axum::http::{Request, header};
    use serde_json::Value;

    use super::*;

    #[test]
    fn test_item_id_accepts_number_and_text() {
        let body: UpdateItemRequest =
            serde_json::from_str(r#"{"cart_item_id": 7, "quantity": 2}"#).unwrap();
        assert_eq!(body.cart_item_id.to_id(), Some(CartItemId::new(7)));
        assert_eq!(body.quantity.to_quantity().unwrap(), 2);

        let body: UpdateItemRequest =
            serde_json::from_str(r#"{"cart_item_id": "7", "quantity": "3"}"#).unwrap();
        assert_eq!(body.cart_item_id.to_id(), Some(CartItemId::new(7)));
        assert_eq!(body.quantity.to_quantity().unwrap(), 3);

        let body: UpdateItemRequest =
            serde_json::from_str(r#"{"cart_item_id": "seven", "quantity": 1}"#).unwrap();
        assert_eq!(body.cart_item_id.to_id(), None);
    }

    #[test]
    fn test_failed_update_reply() {
        let response = UpdateItemResponse::failed(&AppError::from(crate::services::CartError::ItemNotFound));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn reply_for(content_type: &str, body: &'static str) -> (StatusCode, String, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/cart/update-item")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let payload = Json::<UpdateItemRequest>::from_request(request, &()).await;
        let response = parse_update(payload).unwrap_err();

        let status = response.status();
        let content_type = response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_failure() {
        let expected = serde_json::json!({"success": false, "error": "Invalid request"});

        for body in [
            r#"{"cart_item_id": 1}"#,
            r#"{"cart_item_id": null, "quantity": 1}"#,
            r#"{"cart_item_id": 99999999999, "quantity": 1}"#,
            "not json",
        ] {
            let (status, content_type, json) = reply_for("application/json", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(content_type, "application/json");
            assert_eq!(json, expected);
        }

        let (status, _, json) =
            reply_for("text/plain", r#"{"cart_item_id": 1, "quantity": 1}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, expected);
    }

    #[tokio::test]
    async fn test_unparseable_item_id_gets_json_failure() {
        let (status, _, json) = reply_for(
            "application/json",
            r#"{"cart_item_id": "seven", "quantity": 1}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid cart item");
    }

    #[test]
    fn test_success_reply_omits_error() {
        let body = UpdateItemResponse {
            success: true,
            quantity: Some(2),
            ..UpdateItemResponse::default()
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"success": true, "quantity": 2})
        );
    }
}
