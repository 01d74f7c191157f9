use dsts_error::DstsError;

/// Translate a raw `sqlx::Error` into the shared taxonomy. A unique
/// constraint violation becomes `DuplicateEntry`; a missing row from a
/// `fetch_one`/`RETURNING` query becomes `NotFound`; everything else is
/// `Internal` and logged with full detail (never surfaced to callers).
pub fn map_sqlx_error(err: sqlx::Error) -> DstsError {
    match &err {
        sqlx::Error::RowNotFound => DstsError::NotFound,
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                DstsError::DuplicateEntry
            } else {
                tracing::error!(error = %err, "database query failed");
                DstsError::internal(err)
            }
        }
        _ => {
            tracing::error!(error = %err, "database query failed");
            DstsError::internal(err)
        }
    }
}
