//! Account route handlers.
//!
//! These routes require authentication. A profile URL only resolves for the
//! signed-in user's own username.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{PageContext, format_money};
use crate::db::AddressRepository;
use crate::error::AppError;
use crate::filters;
use crate::flash::{self, FlashLevel, redirect_back, warn_and_redirect};
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{AddressInput, CurrentUser, ShippingAddress, User};
use crate::services::{AuthService, CartService};
use crate::state::AppState;

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub order_id: String,
    pub paid_on: String,
    pub item_count: u32,
    pub total: String,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub account: User,
    pub address: Option<ShippingAddress>,
    pub orders: Vec<OrderView>,
}

/// Change password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/change_password.html")]
pub struct ChangePasswordTemplate {
    pub page: PageContext,
}

/// The two forms on the profile page, told apart by a hidden `form` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "form", rename_all = "lowercase")]
pub enum ProfileForm {
    Details {
        first_name: String,
        last_name: String,
        email: String,
    },
    Address(AddressInput),
}

/// Change password form data.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

fn profile_path(username: &str) -> String {
    format!("/profile/{username}")
}

/// Display the profile page with address and order history.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let account = AuthService::new(state.pool())
        .profile(&user, &username)
        .await?;
    let address = AddressRepository::new(state.pool()).current(user.id).await?;
    let currency = state.config().razorpay.currency;

    let orders = CartService::new(state.pool())
        .paid_orders(&user)
        .await?
        .into_iter()
        .filter_map(|order| {
            let paid_on = order
                .cart
                .paid_at
                .map(|at| at.format("%d %b %Y").to_string())
                .unwrap_or_default();
            Some(OrderView {
                order_id: order.cart.razorpay_order_id?,
                paid_on,
                item_count: order.lines.iter().map(|l| l.quantity).sum(),
                total: format_money(order.totals.total, currency),
            })
        })
        .collect();

    Ok(ProfileTemplate {
        page: PageContext::load(&session, Some(user)).await,
        account,
        address,
        orders,
    })
}

/// Update name and email, or save a new current shipping address.
#[instrument(skip(state, session, headers, user, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Path(username): Path<String>,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect, AppError> {
    let base_url = &state.config().base_url;
    let fallback = profile_path(&user.username);

    match save_profile(&state, &session, &user, &username, form).await {
        Ok(message) => {
            flash::push(&session, FlashLevel::Success, message).await?;
            Ok(redirect_back(&headers, base_url, &fallback))
        }
        Err(e) => warn_and_redirect(&session, &e, &headers, base_url, &fallback).await,
    }
}

async fn save_profile(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    username: &str,
    form: ProfileForm,
) -> Result<&'static str, AppError> {
    let auth = AuthService::new(state.pool());
    auth.profile(user, username).await?;

    match form {
        ProfileForm::Details {
            first_name,
            last_name,
            email,
        } => {
            let account = auth
                .update_details(user, &first_name, &last_name, &email)
                .await?;

            // Keep the session copy in step with the new email.
            let refreshed = CurrentUser {
                email: account.email,
                ..user.clone()
            };
            set_current_user(session, &refreshed).await?;

            Ok("Your profile has been updated successfully!")
        }
        ProfileForm::Address(input) => {
            let missing = input.missing_fields();
            if !missing.is_empty() {
                return Err(AppError::Validation(format!(
                    "Please fill in: {}",
                    missing.join(", ")
                )));
            }

            let address = AddressRepository::new(state.pool())
                .save_current(user.id, &input)
                .await?;
            tracing::info!(address_id = %address.id, "Shipping address saved");

            Ok("Your shipping address has been updated successfully!")
        }
    }
}

/// Display the change password page.
pub async fn change_password_page(
    session: Session,
    RequireAuth(user): RequireAuth,
) -> impl IntoResponse {
    ChangePasswordTemplate {
        page: PageContext::load(&session, Some(user)).await,
    }
}

/// Handle change password form submission.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Redirect, AppError> {
    let base_url = &state.config().base_url;

    if let Err(e) = AuthService::new(state.pool())
        .change_password(
            &user,
            &form.old_password,
            &form.new_password1,
            &form.new_password2,
        )
        .await
    {
        return warn_and_redirect(
            &session,
            &AppError::from(e),
            &headers,
            base_url,
            "/change-password",
        )
        .await;
    }

    // Same user, new credentials: issue a fresh session id.
    session.cycle_id().await?;

    flash::push(
        &session,
        FlashLevel::Success,
        "Your password has been successfully updated!",
    )
    .await?;
    Ok(Redirect::to(&profile_path(&user.username)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_form_selects_variant() {
        let form: ProfileForm =
            serde_urlencoded::from_str("form=details&first_name=Asha&last_name=Rao&email=a%40b.test")
                .unwrap();
        assert!(matches!(
            form,
            ProfileForm::Details { ref email, .. } if email == "a@b.test"
        ));

        let form: ProfileForm = serde_urlencoded::from_str(
            "form=address&first_name=Asha&last_name=Rao&street=12+MG+Road&city=Pune\
             &state=MH&zip_code=411001&country=India&phone=9999999999",
        )
        .unwrap();
        match form {
            ProfileForm::Address(input) => {
                assert_eq!(input.street, "12 MG Road");
                assert!(input.missing_fields().is_empty());
            }
            ProfileForm::Details { .. } => panic!("expected address form"),
        }
    }

    #[test]
    fn test_unknown_form_rejected() {
        assert!(serde_urlencoded::from_str::<ProfileForm>("form=other").is_err());
    }
}
