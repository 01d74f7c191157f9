use crate::error_map::map_sqlx_error;
use crate::models::EnrollmentToken;
use crate::pool::with_deadline;
use crate::Store;
use chrono::{DateTime, Utc};
use dsts_error::{DstsError, Result};

impl Store {
    /// Create an enrollment token for a tenant. A tenant may only have one
    /// live enrollment token at a time (`tenant_id` is the primary key);
    /// issuing a second one before the first is deleted surfaces as
    /// `DuplicateEntry`.
    pub async fn create_enrollment_token(
        &self,
        tenant_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<EnrollmentToken> {
        with_deadline(async {
            sqlx::query_as::<_, EnrollmentToken>(
                r#"
                INSERT INTO enrollment_tokens (tenant_id, token, expires_at)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
            )
            .bind(tenant_id)
            .bind(token)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
        })
        .await
    }

    pub async fn get_enrollment_token_for_tenant(&self, tenant_id: &str) -> Result<EnrollmentToken> {
        with_deadline(async {
            sqlx::query_as::<_, EnrollmentToken>("SELECT * FROM enrollment_tokens WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .ok_or(DstsError::NotFound)
        })
        .await
    }

    pub async fn get_enrollment_token_info(&self, token: &str) -> Result<EnrollmentToken> {
        with_deadline(async {
            sqlx::query_as::<_, EnrollmentToken>("SELECT * FROM enrollment_tokens WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .ok_or(DstsError::NotFound)
        })
        .await
    }

    pub async fn delete_enrollment_token(&self, tenant_id: &str) -> Result<()> {
        with_deadline(async {
            let result = sqlx::query("DELETE FROM enrollment_tokens WHERE tenant_id = $1")
                .bind(tenant_id)
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
