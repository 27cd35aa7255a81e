//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use super::{PageContext, format_money};
use crate::db::CatalogRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Product;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i32,
    pub name: String,
    pub price: String,
}

impl ProductView {
    fn new(product: &Product, currency: bazaar_core::CurrencyCode) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            price: format_money(product.price, currency),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
}

/// Display the product list.
#[instrument(skip(state, session, user))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse, AppError> {
    let catalog = CatalogRepository::new(state.pool());
    let currency = state.config().razorpay.currency;

    let products = catalog
        .list_products()
        .await?
        .iter()
        .map(|p| ProductView::new(p, currency))
        .collect();
    let sizes = catalog
        .list_size_variants()
        .await?
        .into_iter()
        .map(|v| v.size_name)
        .collect();
    let colors = catalog
        .list_color_variants()
        .await?
        .into_iter()
        .map(|v| v.color_name)
        .collect();

    Ok(HomeTemplate {
        page: PageContext::load(&session, user).await,
        products,
        sizes,
        colors,
    })
}
