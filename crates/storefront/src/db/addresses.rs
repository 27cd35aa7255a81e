//! Shipping address repository.

use sqlx::PgPool;

use bazaar_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::address::{AddressInput, ShippingAddress};

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: i32,
    user_id: i32,
    first_name: String,
    last_name: String,
    street: String,
    city: String,
    state: String,
    zip_code: String,
    country: String,
    phone: String,
    current_address: bool,
}

impl From<AddressRow> for ShippingAddress {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            first_name: row.first_name,
            last_name: row.last_name,
            street: row.street,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            country: row.country,
            phone: row.phone,
            current_address: row.current_address,
        }
    }
}

const ADDRESS_COLUMNS: &str = "id, user_id, first_name, last_name, street, city, state, \
     zip_code, country, phone, current_address";

/// Repository for shipping addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's current address, if one is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn current(&self, user_id: UserId) -> Result<Option<ShippingAddress>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM storefront.shipping_address
             WHERE user_id = $1 AND current_address"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ShippingAddress::from))
    }

    /// Store an address and make it the user's only current address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn save_current(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<ShippingAddress, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE storefront.shipping_address SET current_address = FALSE
             WHERE user_id = $1 AND current_address",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "INSERT INTO storefront.shipping_address
                (user_id, first_name, last_name, street, city, state, zip_code, country, phone,
                 current_address)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE)
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(input.street.trim())
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(input.zip_code.trim())
        .bind(input.country.trim())
        .bind(input.phone.trim())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }
}
