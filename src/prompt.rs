//! Quantization of the continuous mood/instrument controls into the three
//! discrete levels the generator prompt understands.

/// Snap partitions, tested in order. Both boundaries are inclusive, so the
/// overlapping values 25 and 75 resolve to the first matching partition.
const SNAP_PARTITIONS: [(f64, f64, u8); 3] = [(0.0, 25.0, 0), (25.0, 75.0, 50), (75.0, 100.0, 100)];

/// Snap a control value to one of {0, 50, 100}. Out-of-range input is
/// clamped into [0, 100] first.
pub fn snap(value: f64) -> u8 {
    let value = value.clamp(0.0, 100.0);
    for (lo, hi, point) in SNAP_PARTITIONS {
        if value >= lo && value <= hi {
            return point;
        }
    }
    // Unreachable after the clamp; the partitions cover [0, 100].
    50
}

pub fn mood_label(level: u8) -> &'static str {
    match level {
        0 => "somber",
        100 => "lively",
        _ => "neutral",
    }
}

pub fn instrument_label(level: u8) -> &'static str {
    match level {
        0 => "piano",
        100 => "brass",
        _ => "guitar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_values() {
        assert_eq!(snap(0.0), 0);
        assert_eq!(snap(25.0), 0);
        assert_eq!(snap(50.0), 50);
        assert_eq!(snap(75.0), 50);
        assert_eq!(snap(100.0), 100);
    }

    #[test]
    fn snap_is_idempotent() {
        for v in 0..=100 {
            let once = snap(v as f64);
            assert_eq!(snap(once as f64), once, "v = {v}");
        }
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(snap(-10.0), 0);
        assert_eq!(snap(250.0), 100);
    }

    #[test]
    fn labels_match_levels() {
        assert_eq!(mood_label(snap(10.0)), "somber");
        assert_eq!(mood_label(snap(50.0)), "neutral");
        assert_eq!(mood_label(snap(90.0)), "lively");
        assert_eq!(instrument_label(snap(10.0)), "piano");
        assert_eq!(instrument_label(snap(50.0)), "guitar");
        assert_eq!(instrument_label(snap(90.0)), "brass");
    }
}
