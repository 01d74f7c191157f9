use crate::error_map::map_sqlx_error;
use crate::models::ManagementService;
use crate::pool::with_deadline;
use crate::Store;
use dsts_error::Result;

impl Store {
    pub async fn list_management_services(&self) -> Result<Vec<ManagementService>> {
        with_deadline(async {
            sqlx::query_as::<_, ManagementService>(
                "SELECT service_id, name, is_default FROM management_services",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
        })
        .await
    }
}
