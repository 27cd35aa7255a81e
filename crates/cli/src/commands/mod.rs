//! CLI command implementations.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Storefront database URL: `STOREFRONT_DATABASE_URL`, else `DATABASE_URL`.
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
