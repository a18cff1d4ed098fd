use chrono::{DateTime, Utc};
use rand::Rng;

/// Generate a local user identifier: `user_<epoch millis>_<0..=9999>`.
///
/// Unique only as far as a millisecond clock plus a four-digit suffix goes.
pub fn generate_user_id<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: u32 = rng.gen_range(0..10_000);
    format!("user_{}_{}", now.timestamp_millis(), suffix)
}
