use dsts_cache::{keys, Cache};
use dsts_crypto::{random_letters, CHALLENGE_LENGTH};
use dsts_error::{DstsError, Result};

/// Issue a fresh authentication challenge for `subject_id` (spec §4.5.1:
/// `NoChallenge -> ChallengeIssued`). Always overwrites any existing
/// challenge for the subject — last-writer-wins, re-challenge is
/// idempotent from the caller's point of view.
pub async fn issue_challenge(cache: &dyn Cache, subject_id: &str) -> Result<String> {
    if subject_id.is_empty() {
        return Err(DstsError::invalid_request("subject id was not specified"));
    }

    let challenge = random_letters(CHALLENGE_LENGTH);
    cache
        .put_raw(&keys::challenge_key(subject_id), challenge.clone(), keys::CHALLENGE_TTL)
        .await
        .map_err(DstsError::internal)?;
    Ok(challenge)
}

/// Fetch the currently outstanding challenge for `subject_id`, if any. A
/// `None` return (cache miss or TTL expiry) means the subject has no
/// live challenge to assert against.
pub async fn get_challenge(cache: &dyn Cache, subject_id: &str) -> Result<Option<String>> {
    cache
        .get_raw(&keys::challenge_key(subject_id))
        .await
        .map_err(DstsError::internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsts_cache::NullCache;

    #[tokio::test]
    async fn rejects_an_empty_subject_id() {
        let cache = NullCache;
        let err = issue_challenge(&cache, "").await.expect_err("empty subject id");
        assert!(matches!(err, DstsError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn issued_challenge_is_readable_back_with_the_expected_length() {
        let cache = NullCache;
        let challenge = issue_challenge(&cache, "device-1").await.expect("issue");
        assert_eq!(challenge.len(), dsts_crypto::CHALLENGE_LENGTH);
    }

    #[tokio::test]
    async fn unknown_subject_has_no_outstanding_challenge() {
        let cache = NullCache;
        let found = get_challenge(&cache, "device-unknown").await.expect("lookup");
        assert!(found.is_none());
    }
}
