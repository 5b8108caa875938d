//! Bin placement: mapping a timestamp onto the start of the fixed-width bin
//! that contains it, for a given sampling frequency (§3 "Bin slotting").

use crate::{FreqMs, TimestampMs};

/// Returns the start of the `freq`-wide bin containing `ts`:
/// `floor(ts / freq) * freq`.
///
/// `freq` of zero is meaningless (there is no bin width) and is rejected by
/// callers before this is reached; this function assumes `freq > 0`.
pub fn slot(ts: TimestampMs, freq: FreqMs) -> TimestampMs {
    debug_assert!(freq > 0, "slot width must be positive");
    let freq = freq as i64;
    (ts.div_euclid(freq)) * freq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_to_bin_start() {
        assert_eq!(slot(1_000, 30_000), 0);
        assert_eq!(slot(29_999, 30_000), 0);
        assert_eq!(slot(30_000, 30_000), 30_000);
        assert_eq!(slot(65_000, 30_000), 60_000);
    }

    #[test]
    fn slots_negative_timestamps_toward_negative_infinity() {
        assert_eq!(slot(-1, 30_000), -30_000);
    }

    proptest::proptest! {
        #[test]
        fn slot_is_idempotent(ts in 0i64..10_000_000_000, freq in 1u64..3_600_000) {
            let s = slot(ts, freq);
            proptest::prop_assert_eq!(slot(s, freq), s);
            proptest::prop_assert!(s <= ts);
            proptest::prop_assert!(ts - s < freq as i64);
        }
    }
}
