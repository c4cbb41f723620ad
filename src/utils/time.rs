use crate::constants::BUCKET_SECS;
use std::time::{SystemTime, UNIX_EPOCH};

/// Floor a Unix timestamp to the start of its hour bucket (UTC).
pub fn bucket_start(ts: i64) -> i64 {
    ts - ts.rem_euclid(BUCKET_SECS)
}

/// Inclusive range filter with the zero sentinel meaning "unbounded" on
/// either side.
pub fn in_range(t: i64, from: i64, to: i64) -> bool {
    (from == 0 || t >= from) && (to == 0 || t <= to)
}

/// Bucket that started 24 hours before `now`.
pub fn day_ago_bucket(now: i64) -> i64 {
    bucket_start(now - 24 * 60 * 60)
}

pub fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_floors_to_hour() {
        // 2021-09-01 12:34:56 UTC
        let ts = 1_630_499_696;
        let bucket = bucket_start(ts);
        assert_eq!(bucket % BUCKET_SECS, 0);
        assert!(bucket <= ts && ts - bucket < BUCKET_SECS);
    }

    #[test]
    fn test_same_hour_same_bucket() {
        let ts = 1_630_497_600; // exactly on the hour
        assert_eq!(bucket_start(ts), ts);
        assert_eq!(bucket_start(ts + 10 * 60), ts);
        assert_eq!(bucket_start(ts + 59 * 60 + 59), ts);
    }

    #[test]
    fn test_hour_boundary_splits_buckets() {
        let ts = 1_630_497_600;
        assert_ne!(bucket_start(ts - 1), bucket_start(ts));
        assert_eq!(bucket_start(ts - 1) + BUCKET_SECS, bucket_start(ts));
    }

    #[test]
    fn test_range_sentinels() {
        assert!(in_range(100, 0, 0));
        assert!(in_range(100, 100, 100));
        assert!(in_range(100, 0, 100));
        assert!(in_range(100, 100, 0));
        assert!(!in_range(99, 100, 0));
        assert!(!in_range(101, 0, 100));
    }

    #[test]
    fn test_day_ago_bucket() {
        let now = 1_630_499_696;
        let day = day_ago_bucket(now);
        assert_eq!(day % BUCKET_SECS, 0);
        assert!(now - day >= 24 * 60 * 60);
        assert!(now - day < 24 * 60 * 60 + BUCKET_SECS);
    }
}
