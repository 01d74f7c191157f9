use chrono::{DateTime, Duration, Utc};
use dsts_crypto::random::ENROLLMENT_TOKEN_LENGTH;
use dsts_crypto::random_letters;
use dsts_error::{reasons, DstsError, Result};
use dsts_store::Store;

const DEFAULT_LIFETIME_DAYS: i64 = 30;
const MAX_LIFETIME_DAYS: i64 = 5 * 365;

/// Resolve the caller-requested `lifetime_days` to the actual lifetime
/// used, per spec §4.6: `0` means the default, `-1` means the maximum,
/// anything over the maximum is clamped down to it, and anything under
/// `-1` is rejected outright.
fn resolve_lifetime_days(lifetime_days: i32) -> Result<i64> {
    match lifetime_days {
        0 => Ok(DEFAULT_LIFETIME_DAYS),
        -1 => Ok(MAX_LIFETIME_DAYS),
        d if d < -1 => Err(DstsError::invalid_request(
            "enrollment token lifetime specified is invalid",
        )),
        d if i64::from(d) > MAX_LIFETIME_DAYS => Ok(MAX_LIFETIME_DAYS),
        d => Ok(i64::from(d)),
    }
}

/// Create a new enrollment token for a tenant and persist it.
pub async fn create_enrollment_token(
    store: &Store,
    tenant_id: &str,
    lifetime_days: i32,
) -> Result<(String, DateTime<Utc>)> {
    let days = resolve_lifetime_days(lifetime_days)?;
    let token = random_letters(ENROLLMENT_TOKEN_LENGTH);
    let expires_at = Utc::now() + Duration::hours(24 * days);

    let record = store.create_enrollment_token(tenant_id, &token, expires_at).await?;
    Ok((record.token, record.expires_at))
}

/// Validate a presented enrollment token and return the tenant it was
/// issued to. Deliberately opaque on failure (spec §4.6): an unknown
/// token and a malformed one both report `InvalidEnrollmentToken` so a
/// caller can't probe for which tenants have live tokens.
pub async fn validate_enrollment_token(store: &Store, token: &str) -> Result<String> {
    if token.len() > ENROLLMENT_TOKEN_LENGTH {
        return Err(DstsError::unauthorized(reasons::INVALID_ENROLLMENT_TOKEN));
    }

    let record = match store.get_enrollment_token_info(token).await {
        Ok(record) => record,
        Err(DstsError::NotFound) => {
            return Err(DstsError::unauthorized(reasons::INVALID_ENROLLMENT_TOKEN))
        }
        Err(other) => return Err(other),
    };

    if record.token != token {
        return Err(DstsError::unauthorized(reasons::INVALID_ENROLLMENT_TOKEN));
    }

    if record.expires_at < Utc::now() {
        return Err(DstsError::unauthorized(reasons::EXPIRED_ENROLLMENT_TOKEN));
    }

    Ok(record.tenant_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_lifetime_resolves_to_default() {
        assert_eq!(resolve_lifetime_days(0).unwrap(), DEFAULT_LIFETIME_DAYS);
    }

    #[test]
    fn minus_one_resolves_to_maximum() {
        assert_eq!(resolve_lifetime_days(-1).unwrap(), MAX_LIFETIME_DAYS);
    }

    #[test]
    fn oversized_lifetime_is_clamped() {
        assert_eq!(resolve_lifetime_days(10_000).unwrap(), MAX_LIFETIME_DAYS);
    }

    #[test]
    fn lifetime_below_sentinel_is_rejected() {
        assert!(resolve_lifetime_days(-2).is_err());
    }
}
