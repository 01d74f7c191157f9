use crate::error_map::map_sqlx_error;
use crate::models::SigningKey;
use crate::pool::with_deadline;
use crate::Store;
use dsts_error::{DstsError, Result};

impl Store {
    /// Persist a newly generated signing key. A second key inserted with
    /// `is_primary = true` fails the unique partial index on
    /// `signing_keys(is_primary) WHERE is_primary`, surfacing as
    /// `DuplicateEntry` (invariant I1: at most one primary key at a time).
    pub async fn add_signing_key(
        &self,
        key_id: &str,
        private_key_pem: &str,
        is_primary: bool,
    ) -> Result<SigningKey> {
        with_deadline(async {
            sqlx::query_as::<_, SigningKey>(
                r#"
                INSERT INTO signing_keys (key_id, private_key, enabled, is_primary)
                VALUES ($1, $2, TRUE, $3)
                RETURNING *
                "#,
            )
            .bind(key_id)
            .bind(private_key_pem)
            .bind(is_primary)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
        })
        .await
    }

    pub async fn get_signing_key(&self, key_id: &str) -> Result<SigningKey> {
        with_deadline(async {
            sqlx::query_as::<_, SigningKey>("SELECT * FROM signing_keys WHERE key_id = $1")
                .bind(key_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .ok_or(DstsError::NotFound)
        })
        .await
    }

    pub async fn get_primary_signing_key(&self) -> Result<SigningKey> {
        with_deadline(async {
            sqlx::query_as::<_, SigningKey>(
                "SELECT * FROM signing_keys WHERE is_primary = TRUE AND enabled = TRUE",
            )
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(DstsError::NotFound)
        })
        .await
    }

    pub async fn delete_signing_key(&self, key_id: &str) -> Result<()> {
        with_deadline(async {
            let result = sqlx::query("DELETE FROM signing_keys WHERE key_id = $1")
                .bind(key_id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            if result.rows_affected() == 0 {
                return Err(DstsError::NotFound);
            }
            Ok(())
        })
        .await
    }
}
