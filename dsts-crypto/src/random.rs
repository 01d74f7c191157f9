use rand::RngCore;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Cryptographically strong random string over `[A-Za-z]`, sampled
/// byte-wise with rejection sampling so every letter is equally likely
/// (a naive `byte % 52` would bias toward the first few letters).
pub fn random_letters(len: usize) -> String {
    let mut rng = rand::rngs::OsRng;
    let mut out = String::with_capacity(len);
    let mut buf = [0u8; 1];
    while out.len() < len {
        rng.fill_bytes(&mut buf);
        // 256 is not a multiple of 52; reject the high tail to stay uniform.
        if buf[0] < 208 {
            let idx = (buf[0] % 52) as usize;
            #[allow(clippy::indexing_slicing)]
            out.push(ALPHABET[idx] as char);
        }
    }
    out
}

/// Length of an authentication challenge (spec §4.5.1 / §9): fixed at 10
/// for every subject kind.
pub const CHALLENGE_LENGTH: usize = 10;

/// Length of an enrollment token (spec §4.6).
pub const ENROLLMENT_TOKEN_LENGTH: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_letters_has_requested_length_and_alphabet() {
        let s = random_letters(CHALLENGE_LENGTH);
        assert_eq!(s.len(), CHALLENGE_LENGTH);
        assert!(s.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn successive_challenges_differ() {
        let a = random_letters(CHALLENGE_LENGTH);
        let b = random_letters(CHALLENGE_LENGTH);
        assert_ne!(a, b);
    }
}
