//! Confirmation number generation.
//!
//! Every application gets a human-legible code of the form
//! `SS-IMM-<TIME8>-<RAND3>`: the last eight digits of the unix timestamp plus
//! a three-digit random suffix. Collisions are resolved by regenerating only
//! the suffix; after the retry budget is exhausted the last candidate is
//! accepted anyway (fail-open) so code generation can never block a
//! submission.

use rand::Rng;
use sqlx::PgPool;

use crate::errors::AppError;

/// Prefix shared by every confirmation number.
pub const CONFIRMATION_PREFIX: &str = "SS-IMM";

/// Digits in the random suffix.
const SUFFIX_LEN: usize = 3;

/// Digits of unix time kept in the time component.
const TIME_LEN: usize = 8;

/// Retry budget before accepting a possibly colliding candidate.
const MAX_ATTEMPTS: u32 = 100;

/// Build a candidate code from a unix timestamp and a random suffix.
pub fn candidate<R: Rng>(unix_secs: i64, rng: &mut R) -> String {
    let ts = unix_secs.to_string();
    let time_part = &ts[ts.len().saturating_sub(TIME_LEN)..];
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect();
    format!("{CONFIRMATION_PREFIX}-{time_part}-{suffix}")
}

/// Check that a string has the `SS-IMM-<TIME8>-<RAND3>` shape.
pub fn is_well_formed(code: &str) -> bool {
    let mut parts = code.splitn(3, '-');
    let prefix = (parts.next(), parts.next());
    if prefix != (Some("SS"), Some("IMM")) {
        return false;
    }
    let Some(rest) = parts.next() else {
        return false;
    };
    match rest.split_once('-') {
        Some((time, suffix)) => {
            time.len() == TIME_LEN
                && suffix.len() == SUFFIX_LEN
                && time.chars().all(|c| c.is_ascii_digit())
                && suffix.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Generate a confirmation number that is unique among existing applications.
///
/// The time component is fixed for the whole call; only the suffix is
/// regenerated on collision. Exhausting the retry budget logs a warning and
/// returns the last candidate unchecked rather than failing the submission.
pub async fn assign(pool: &PgPool) -> Result<String, AppError> {
    let now = chrono::Utc::now().timestamp();
    let mut code = candidate(now, &mut rand::thread_rng());

    for _ in 0..MAX_ATTEMPTS {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM applications WHERE confirmation_number = $1)",
        )
        .bind(&code)
        .fetch_one(pool)
        .await?;

        if !exists {
            return Ok(code);
        }
        code = candidate(now, &mut rand::thread_rng());
    }

    tracing::warn!(
        code = %code,
        attempts = MAX_ATTEMPTS,
        "Confirmation number retry budget exhausted; accepting last candidate"
    );
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn candidate_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let code = candidate(1_700_000_000, &mut rng);
        assert!(is_well_formed(&code), "bad shape: {code}");
        assert!(code.starts_with("SS-IMM-"));
    }

    #[test]
    fn candidate_uses_last_eight_digits_of_time() {
        let mut rng = StdRng::seed_from_u64(7);
        let code = candidate(1_234_567_890_123, &mut rng);
        let time_part = code.split('-').nth(2).unwrap();
        assert_eq!(time_part, "67890123");
    }

    #[test]
    fn candidate_pads_nothing_for_short_timestamps() {
        // A timestamp shorter than eight digits keeps whatever digits exist.
        let mut rng = StdRng::seed_from_u64(7);
        let code = candidate(42, &mut rng);
        let time_part = code.split('-').nth(2).unwrap();
        assert_eq!(time_part, "42");
        assert!(!is_well_formed(&code));
    }

    #[test]
    fn same_time_different_rng_varies_only_suffix() {
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(2);
        let ca = candidate(1_700_000_000, &mut a);
        let cb = candidate(1_700_000_000, &mut b);
        let (ta, sa) = ca.rsplit_once('-').unwrap();
        let (tb, sb) = cb.rsplit_once('-').unwrap();
        assert_eq!(ta, tb);
        assert_ne!(sa, sb);
    }

    #[test]
    fn suffix_is_three_digits() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let code = candidate(1_700_000_000, &mut rng);
            let suffix = code.rsplit('-').next().unwrap();
            assert_eq!(suffix.len(), 3);
            assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn well_formed_rejects_wrong_shapes() {
        assert!(is_well_formed("SS-IMM-12345678-042"));
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("SS-IMM-12345678"));
        assert!(!is_well_formed("SS-IMM-1234567x-042"));
        assert!(!is_well_formed("SS-IMM-12345678-42"));
        assert!(!is_well_formed("XX-IMM-12345678-042"));
        assert!(!is_well_formed("SS-IMM-12345678-042-9"));
    }
}
