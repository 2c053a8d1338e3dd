use rand::RngCore;

// No I, O, 0 or 1: codes get read aloud and retyped.
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const REFERRAL_CODE_PREFIX: &str = "OKURA";
pub const REFERRER_REWARD_PREFIX: &str = "OKREF";
pub const REFEREE_REWARD_PREFIX: &str = "OKNEW";

pub const REFERRAL_CODE_LEN: usize = 6;
pub const DISCOUNT_CODE_LEN: usize = 8;

/// Collision handling is the caller's job: generated codes must be checked
/// against the ledger and retried (`Ledger::mint_referral_code`).
pub fn generate_referral_code() -> String {
    format!("{REFERRAL_CODE_PREFIX}-{}", random_body(REFERRAL_CODE_LEN))
}

pub fn generate_discount_code(prefix: &str) -> String {
    format!("{prefix}-{}", random_body(DISCOUNT_CODE_LEN))
}

fn random_body(len: usize) -> String {
    let mut bytes = vec![0_u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| CODE_ALPHABET[(b % CODE_ALPHABET.len() as u8) as usize] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_codes_have_prefix_and_length() {
        for _ in 0..100 {
            let code = generate_referral_code();
            let body = code.strip_prefix("OKURA-").unwrap();
            assert_eq!(body.len(), REFERRAL_CODE_LEN);
            assert!(body.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn discount_codes_have_prefix_and_length() {
        for _ in 0..100 {
            let code = generate_discount_code(REFERRER_REWARD_PREFIX);
            let body = code.strip_prefix("OKREF-").unwrap();
            assert_eq!(body.len(), DISCOUNT_CODE_LEN);
            assert!(body.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn alphabet_excludes_ambiguous_symbols() {
        for banned in [b'I', b'O', b'0', b'1'] {
            assert!(!CODE_ALPHABET.contains(&banned));
        }
        assert_eq!(CODE_ALPHABET.len(), 32);
    }
}
