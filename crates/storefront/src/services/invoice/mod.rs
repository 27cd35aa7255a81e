//! Invoice generation for paid carts.
//!
//! The invoice is an Askama text template set into a PDF by [`pdf`]. Each
//! generated file is kept under the invoice directory with a fresh UUID name;
//! the download is named after the provider order.

pub mod pdf;

use std::path::{Path, PathBuf};

use askama::Template;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use bazaar_core::{CurrencyCode, Money};

use super::cart::price_cart;
use crate::db::{AddressRepository, CartRepository, RepositoryError, UserRepository};
use crate::models::{CurrentUser, PricedCart, ShippingAddress, User};

/// Errors from invoice generation.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// No cart of this user carries the order id.
    #[error("Order not found")]
    CartNotFound,

    /// Invoices exist only for paid carts.
    #[error("This order has not been paid yet")]
    NotPaid,

    #[error("template error: {0}")]
    Render(#[from] askama::Error),

    #[error("could not write invoice: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A rendered invoice.
#[derive(Debug)]
pub struct InvoiceDocument {
    /// Attachment name offered to the browser.
    pub file_name: String,
    /// Where the copy was written.
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

struct InvoiceLine {
    name: String,
    variant: String,
    quantity: u32,
    unit_price: String,
    total: String,
}

#[derive(Template)]
#[template(path = "invoice/invoice.txt")]
struct InvoiceText<'a> {
    order_id: &'a str,
    payment_id: &'a str,
    order_date: String,
    customer_name: String,
    customer_email: &'a str,
    address: Option<&'a ShippingAddress>,
    lines: Vec<InvoiceLine>,
    subtotal: String,
    coupon_code: Option<&'a str>,
    discount: String,
    total: String,
    /// What the provider charged, from the amount fixed at checkout.
    amount_paid: String,
}

impl<'a> InvoiceText<'a> {
    fn new(
        order_id: &'a str,
        cart: &'a PricedCart,
        user: &'a User,
        address: Option<&'a ShippingAddress>,
        currency: CurrencyCode,
    ) -> Self {
        let money = |amount: Decimal| Money::new(amount, currency).to_string();
        let placed = cart.cart.paid_at.unwrap_or(cart.cart.created_at);

        Self {
            order_id,
            payment_id: cart.cart.razorpay_payment_id.as_deref().unwrap_or("-"),
            order_date: placed.format("%d %B %Y").to_string(),
            customer_name: user.full_name(),
            customer_email: user.email.as_str(),
            address,
            lines: cart
                .lines
                .iter()
                .map(|line| InvoiceLine {
                    name: line.product_name.clone(),
                    variant: line.variant_label(),
                    quantity: line.quantity,
                    unit_price: money(line.unit_price),
                    total: money(line.line_total()),
                })
                .collect(),
            subtotal: money(cart.totals.subtotal),
            coupon_code: cart.coupon.as_ref().map(|c| c.code.as_str()),
            discount: money(cart.totals.discount),
            total: money(cart.totals.total),
            amount_paid: cart.cart.checkout_amount_paise.map_or_else(
                || "-".to_string(),
                |paise| Money::from_minor_units(paise, currency).to_string(),
            ),
        }
    }
}

/// Builds invoices for the signed-in user's paid carts.
pub struct InvoiceService<'a> {
    pool: &'a PgPool,
    invoice_dir: &'a Path,
    currency: CurrencyCode,
}

impl<'a> InvoiceService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, invoice_dir: &'a Path, currency: CurrencyCode) -> Self {
        Self {
            pool,
            invoice_dir,
            currency,
        }
    }

    /// Render, store and return the invoice for `order_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::CartNotFound` if the user has no cart with that
    /// order, `InvoiceError::NotPaid` if it is unpaid, and `Io` if the file
    /// cannot be written.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn generate(
        &self,
        user: &CurrentUser,
        order_id: &str,
    ) -> Result<InvoiceDocument, InvoiceError> {
        let cart = CartRepository::new(self.pool)
            .get_by_order_id(user.id, order_id)
            .await?
            .ok_or(InvoiceError::CartNotFound)?;

        if !cart.is_paid {
            return Err(InvoiceError::NotPaid);
        }

        let cart = price_cart(self.pool, cart).await?;
        let account = UserRepository::new(self.pool)
            .get_by_id(user.id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let address = AddressRepository::new(self.pool).current(user.id).await?;

        let text =
            InvoiceText::new(order_id, &cart, &account, address.as_ref(), self.currency).render()?;
        let bytes = pdf::render_text(&text);

        tokio::fs::create_dir_all(self.invoice_dir).await?;
        let path = self.invoice_dir.join(format!("{}.pdf", Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await?;

        info!(cart_id = %cart.cart.id, path = %path.display(), "Invoice written");

        Ok(InvoiceDocument {
            file_name: attachment_name(order_id),
            path,
            bytes,
        })
    }
}

/// Download name for an order's invoice.
#[must_use]
pub fn attachment_name(order_id: &str) -> String {
    let safe: String = order_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("invoice_{safe}.pdf")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{TimeZone, Utc};

    use bazaar_core::cart::{CouponTerms, DiscountRule};
    use bazaar_core::{
        AddressId, CartId, CartItemId, CouponId, Email, ProductId, UserId,
    };

    use super::*;
    use crate::models::{Cart, CartLine, Coupon};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn paid_cart() -> PricedCart {
        let paid_at = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();
        let cart = Cart {
            id: CartId::new(7),
            user_id: UserId::new(1),
            coupon_id: Some(CouponId::new(3)),
            is_paid: true,
            razorpay_order_id: Some("order_Abc123".to_string()),
            checkout_amount_paise: Some(9500),
            razorpay_payment_id: Some("pay_Xyz".to_string()),
            paid_at: Some(paid_at),
            created_at: paid_at,
        };
        let lines = vec![
            CartLine {
                item_id: CartItemId::new(1),
                product_id: ProductId::new(1),
                product_name: "Cotton Tee".to_string(),
                size_name: Some("M".to_string()),
                color_name: None,
                quantity: 1,
                unit_price: dec("40.00"),
            },
            CartLine {
                item_id: CartItemId::new(2),
                product_id: ProductId::new(2),
                product_name: "Denim (Slim)".to_string(),
                size_name: None,
                color_name: Some("Blue".to_string()),
                quantity: 1,
                unit_price: dec("65.00"),
            },
        ];
        let coupon = Coupon {
            id: CouponId::new(3),
            code: "FLAT10".to_string(),
            terms: CouponTerms {
                minimum_amount: dec("50.00"),
                is_expired: false,
                expires_at: None,
                rule: DiscountRule::flat(dec("10.00")),
            },
        };
        PricedCart::new(cart, lines, Some(coupon))
    }

    fn user() -> User {
        User {
            id: UserId::new(1),
            username: "asha".to_string(),
            email: Email::parse("asha@example.in").unwrap(),
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            is_email_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            id: AddressId::new(1),
            user_id: UserId::new(1),
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            street: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "MH".to_string(),
            zip_code: "411001".to_string(),
            country: "India".to_string(),
            phone: "9800000000".to_string(),
            current_address: true,
        }
    }

    #[test]
    fn test_invoice_text_contents() {
        let cart = paid_cart();
        let user = user();
        let address = address();
        let text = InvoiceText::new("order_Abc123", &cart, &user, Some(&address), CurrencyCode::INR)
            .render()
            .unwrap();

        assert!(text.contains("order_Abc123"));
        assert!(text.contains("14 March 2026"));
        assert!(text.contains("Asha Rao"));
        assert!(text.contains("asha@example.in"));
        assert!(text.contains("12 MG Road"));
        assert!(text.contains("Cotton Tee"));
        assert!(text.contains("Subtotal: INR 105.00"));
        assert!(text.contains("FLAT10"));
        assert!(text.contains("Total: INR 95.00"));
        assert!(text.contains("Amount paid: INR 95.00"));
    }

    #[test]
    fn test_invoice_shows_charged_amount_after_price_change() {
        let mut cart = paid_cart();
        cart.lines[1].unit_price = dec("75.00");
        let cart = PricedCart::new(cart.cart, cart.lines, cart.coupon);
        let user = user();
        let text = InvoiceText::new("order_Abc123", &cart, &user, None, CurrencyCode::INR)
            .render()
            .unwrap();

        assert!(text.contains("Total: INR 105.00"));
        assert!(text.contains("Amount paid: INR 95.00"));
    }

    #[test]
    fn test_invoice_without_address() {
        let cart = paid_cart();
        let user = user();
        let text = InvoiceText::new("order_Abc123", &cart, &user, None, CurrencyCode::INR)
            .render()
            .unwrap();
        assert!(text.contains("No shipping address on file"));
    }

    #[test]
    fn test_invoice_pdf_escapes_product_names() {
        let cart = paid_cart();
        let user = user();
        let text = InvoiceText::new("order_Abc123", &cart, &user, None, CurrencyCode::INR)
            .render()
            .unwrap();
        let pdf = String::from_utf8(pdf::render_text(&text)).unwrap();
        assert!(pdf.contains(r"Denim \(Slim\)"));
    }

    #[test]
    fn test_attachment_name() {
        assert_eq!(attachment_name("order_Abc123"), "invoice_order_Abc123.pdf");
        assert_eq!(attachment_name("order\"; x=/.."), "invoice_orderx.pdf");
    }
}
