//! Human-relative "time ago" text for received timestamps.

use chrono::{DateTime, Utc};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 1440;

/// Whole minutes elapsed between `received_at` and `now`. Timestamps in the
/// future (worker clock skew) count as zero.
pub fn minutes_ago(received_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
  (now - received_at).num_minutes().max(0)
}

/// Spanish relative text, e.g. `hace 5 minuto(s)`, `hace 2 hora(s)`.
pub fn time_ago_text(minutes: i64) -> String {
  if minutes < MINUTES_PER_HOUR {
    format!("hace {minutes} minuto(s)")
  } else if minutes < MINUTES_PER_DAY {
    format!("hace {} hora(s)", minutes / MINUTES_PER_HOUR)
  } else {
    format!("hace {} día(s)", minutes / MINUTES_PER_DAY)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  #[test]
  fn buckets() {
    assert_eq!(time_ago_text(0), "hace 0 minuto(s)");
    assert_eq!(time_ago_text(59), "hace 59 minuto(s)");
    assert_eq!(time_ago_text(60), "hace 1 hora(s)");
    assert_eq!(time_ago_text(1439), "hace 23 hora(s)");
    assert_eq!(time_ago_text(1440), "hace 1 día(s)");
    assert_eq!(time_ago_text(4000), "hace 2 día(s)");
  }

  #[test]
  fn minutes_truncate_and_clamp() {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    assert_eq!(minutes_ago(now - Duration::seconds(179), now), 2);
    assert_eq!(minutes_ago(now - Duration::minutes(3), now), 3);
    assert_eq!(minutes_ago(now + Duration::minutes(4), now), 0);
  }
}
