//! One-shot flash messages kept in the session.
//!
//! Form handlers push a message and redirect; the next rendered page takes
//! the pending messages out of the session and shows them once.

use axum::http::{HeaderMap, header};
use axum::response::Redirect;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use url::Url;

use crate::error::AppError;
use crate::models::session_keys;

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
}

/// A message waiting to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    /// CSS class for the alert box.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.level {
            FlashLevel::Success => "alert-success",
            FlashLevel::Info => "alert-info",
            FlashLevel::Warning => "alert-warning",
        }
    }
}

/// Queue a message for the next page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn push(
    session: &Session,
    level: FlashLevel,
    text: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    let mut pending: Vec<FlashMessage> = session
        .get(session_keys::FLASH)
        .await?
        .unwrap_or_default();
    pending.push(FlashMessage {
        level,
        text: text.into(),
    });
    session.insert(session_keys::FLASH, pending).await
}

/// Take all pending messages. A broken session yields none.
pub async fn take(session: &Session) -> Vec<FlashMessage> {
    match session.remove::<Vec<FlashMessage>>(session_keys::FLASH).await {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read flash messages");
            Vec::new()
        }
    }
}

/// Path and query of `referer` if it points at `base_url`'s origin.
#[must_use]
pub fn same_origin_path(referer: &str, base_url: &str) -> Option<String> {
    let referer = Url::parse(referer).ok()?;
    let base = Url::parse(base_url).ok()?;

    if referer.origin() != base.origin() {
        return None;
    }

    Some(match referer.query() {
        Some(query) => format!("{}?{query}", referer.path()),
        None => referer.path().to_string(),
    })
}

/// Redirect to the referring page when it is ours, otherwise to `fallback`.
#[must_use]
pub fn redirect_back(headers: &HeaderMap, base_url: &str, fallback: &str) -> Redirect {
    let target = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| same_origin_path(referer, base_url))
        .unwrap_or_else(|| fallback.to_string());

    Redirect::to(&target)
}

/// Turn a handler error into a warning flash and a redirect back.
///
/// The error is still logged (and reported when it is server-side).
///
/// # Errors
///
/// Returns the session error if the message cannot be stored.
pub async fn warn_and_redirect(
    session: &Session,
    err: &AppError,
    headers: &HeaderMap,
    base_url: &str,
    fallback: &str,
) -> Result<Redirect, AppError> {
    err.report();
    push(session, FlashLevel::Warning, err.user_message()).await?;
    Ok(redirect_back(headers, base_url, fallback))
}
