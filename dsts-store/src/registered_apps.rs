use crate::error_map::map_sqlx_error;
use crate::models::RegisteredApp;
use crate::pool::with_deadline;
use crate::Store;
use dsts_error::{DstsError, Result};

impl Store {
    /// Register (or re-register) an app. Upserts on `app_id`: re-running
    /// app registration at startup with an unchanged config file simply
    /// refreshes `name`/`enabled`/`public_key`.
    pub async fn add_or_update_registered_app(
        &self,
        app_id: &str,
        name: &str,
        enabled: bool,
        public_key_pem: &str,
    ) -> Result<RegisteredApp> {
        with_deadline(async {
            sqlx::query_as::<_, RegisteredApp>(
                r#"
                INSERT INTO registered_apps (app_id, name, enabled, public_key)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (app_id) DO UPDATE SET
                    name = $2, enabled = $3, public_key = $4, updated_at = now()
                RETURNING *
                "#,
            )
            .bind(app_id)
            .bind(name)
            .bind(enabled)
            .bind(public_key_pem)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
        })
        .await
    }

    pub async fn get_registered_app(&self, app_id: &str) -> Result<RegisteredApp> {
        with_deadline(async {
            sqlx::query_as::<_, RegisteredApp>("SELECT * FROM registered_apps WHERE app_id = $1")
                .bind(app_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .ok_or(DstsError::NotFound)
        })
        .await
    }

    pub async fn delete_registered_app(&self, app_id: &str) -> Result<()> {
        with_deadline(async {
            let result = sqlx::query("DELETE FROM registered_apps WHERE app_id = $1")
                .bind(app_id)
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
