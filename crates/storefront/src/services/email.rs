//! Transactional email: account activation.
//!
//! Uses SMTP via lettre for delivery with Askama templates (text + HTML).

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Template)]
#[template(path = "email/activation.html")]
struct ActivationEmailHtml<'a> {
    name: &'a str,
    activation_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/activation.txt")]
struct ActivationEmailText<'a> {
    name: &'a str,
    activation_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Sends the storefront's transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create an email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the account activation link to a newly registered user.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to render or send.
    pub async fn send_activation(
        &self,
        to: &str,
        name: &str,
        activation_url: &str,
    ) -> Result<(), EmailError> {
        let html = ActivationEmailHtml {
            name,
            activation_url,
        }
        .render()?;
        let text = ActivationEmailText {
            name,
            activation_url,
        }
        .render()?;

        self.send_multipart_email(to, "Your account needs to be verified", &text, &html)
            .await
    }

    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

/// Build the link a user follows to activate their account.
#[must_use]
pub fn activation_url(base_url: &str, token: &str) -> String {
    format!("{}/activate/{token}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_url() {
        assert_eq!(
            activation_url("https://shop.test/", "abc_-123"),
            "https://shop.test/activate/abc_-123"
        );
    }

    #[test]
    fn test_activation_templates_render_link() {
        let url = "https://shop.test/activate/tok";
        let html = ActivationEmailHtml {
            name: "Asha",
            activation_url: url,
        }
        .render()
        .unwrap();
        let text = ActivationEmailText {
            name: "Asha",
            activation_url: url,
        }
        .render()
        .unwrap();

        assert!(html.contains("href=\"https://shop.test/activate/tok\""));
        assert!(text.contains(url));
        assert!(text.contains("Asha"));
    }
}
