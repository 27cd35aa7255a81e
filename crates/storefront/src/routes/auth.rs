//! Authentication route handlers.
//!
//! Handles login, registration, logout and email activation. Failures are
//! shown as flash warnings on the form page they came from.

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

use super::PageContext;
use crate::error::{AppError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::flash::{self, FlashLevel, warn_and_redirect};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::services::AuthService;
use crate::services::auth::RegisterInput;
use crate::services::email::activation_url;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(session: Session, OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    LoginTemplate {
        page: PageContext::load(&session, user).await,
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, headers, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, AppError> {
    let base_url = &state.config().base_url;

    let user = match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            return warn_and_redirect(&session, &AppError::from(e), &headers, base_url, "/login").await;
        }
    };

    set_current_user(&session, &user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    add_breadcrumb("auth", "Login", &[("username", user.username.as_str())]);

    flash::push(&session, FlashLevel::Success, "Login successful.").await?;
    Ok(Redirect::to("/"))
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    RegisterTemplate {
        page: PageContext::load(&session, user).await,
    }
}

/// Handle registration form submission.
///
/// The account is created unverified and the activation link is mailed. A
/// failed send is logged; the user can ask support to resend.
#[instrument(skip(state, session, headers, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RegisterInput>,
) -> Result<Redirect, AppError> {
    let base_url = &state.config().base_url;

    let registration = match AuthService::new(state.pool()).register(&form).await {
        Ok(registration) => registration,
        Err(e) => {
            return warn_and_redirect(&session, &AppError::from(e), &headers, base_url, "/register").await;
        }
    };

    let link = activation_url(base_url, &registration.email_token);
    let user = &registration.user;

    match state.email() {
        Some(email) => {
            if let Err(e) = email
                .send_activation(user.email.as_str(), &user.full_name(), &link)
                .await
            {
                tracing::error!(user_id = %user.id, error = %e, "Failed to send activation email");
            }
        }
        None => {
            tracing::debug!(user_id = %user.id, activation_url = %link, "Email disabled; activation link not sent");
        }
    }

    flash::push(
        &session,
        FlashLevel::Success,
        "Account created. Check your email to verify your account.",
    )
    .await?;
    Ok(Redirect::to("/login"))
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();

    flash::push(&session, FlashLevel::Info, "Logged out successfully!").await?;
    Ok(Redirect::to("/"))
}

// =============================================================================
// Activation Route
// =============================================================================

/// Verify the email address holding `token`.
#[instrument(skip_all)]
pub async fn activate(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
) -> Result<Redirect, AppError> {
    if let Err(e) = AuthService::new(state.pool()).activate(&token).await {
        let err = AppError::from(e);
        err.report();
        flash::push(&session, FlashLevel::Warning, err.user_message()).await?;
        return Ok(Redirect::to("/login"));
    }

    flash::push(
        &session,
        FlashLevel::Success,
        "Account verification successful.",
    )
    .await?;
    Ok(Redirect::to("/login"))
}
