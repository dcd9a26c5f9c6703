//! Flow index
//!
//! A bounded activity score over the last hour of the local log:
//! `round((0.7 * freq + 0.3 * diversity) * 99)` where `freq` saturates at
//! 30 entries per hour and `diversity` at all three tones.

use crate::storage::MemoryLogEntry;
use crate::time::now_millis;
use std::collections::HashSet;

/// Window considered recent
pub const FLOW_WINDOW_MS: i64 = 60 * 60 * 1000;

/// Entries per window that count as full activity
pub const FLOW_SATURATION: usize = 30;

/// Number of distinct tones
pub const TONE_CLASSES: usize = 3;

/// Highest flow index
pub const FLOW_MAX: u8 = 99;

/// Flow index of `log` as of `now` (milliseconds)
pub fn compute_at(log: &[MemoryLogEntry], now: i64) -> u8 {
    if log.is_empty() {
        return 0;
    }

    let recent: Vec<&MemoryLogEntry> = log
        .iter()
        .filter(|e| now.saturating_sub(e.ts) <= FLOW_WINDOW_MS)
        .collect();

    let freq = (recent.len() as f64 / FLOW_SATURATION as f64).min(1.0);
    let tones: HashSet<_> = recent.iter().map(|e| e.tone).collect();
    let diversity = (tones.len() as f64 / TONE_CLASSES as f64).min(1.0);

    let index = ((0.7 * freq + 0.3 * diversity) * FLOW_MAX as f64).round();
    index.clamp(0.0, FLOW_MAX as f64) as u8
}

/// Flow index of `log` right now
pub fn compute(log: &[MemoryLogEntry]) -> u8 {
    compute_at(log, now_millis())
}

/// Two-digit display form (`"07"`)
pub fn format_flow_index(value: u8) -> String {
    format!("{:02}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::Tone;

    const NOW: i64 = 1_700_000_000_000;

    fn entry(tone: Tone, age_ms: i64) -> MemoryLogEntry {
        MemoryLogEntry {
            text: "x".to_string(),
            tone,
            ts: NOW - age_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_log_is_zero() {
        assert_eq!(compute_at(&[], NOW), 0);
    }

    #[test]
    fn test_single_recent_entry() {
        // freq 1/30, diversity 1/3
        let log = vec![entry(Tone::Reflective, 1000)];
        let expected = ((0.7 / 30.0 + 0.1) * 99.0_f64).round() as u8;
        assert_eq!(compute_at(&log, NOW), expected);
        assert_eq!(expected, 12);
    }

    #[test]
    fn test_old_entries_ignored() {
        let log = vec![entry(Tone::Creative, FLOW_WINDOW_MS + 1)];
        assert_eq!(compute_at(&log, NOW), 0);

        let log = vec![entry(Tone::Creative, FLOW_WINDOW_MS)];
        assert!(compute_at(&log, NOW) > 0);
    }

    #[test]
    fn test_saturates_at_99() {
        let mut log = Vec::new();
        for i in 0..40 {
            let tone = Tone::ALL[i % 3];
            log.push(entry(tone, i as i64 * 1000));
        }
        assert_eq!(compute_at(&log, NOW), 99);
    }

    #[test]
    fn test_bounded_for_many_shapes() {
        for count in [0usize, 1, 5, 29, 30, 31, 500] {
            for tones in 1..=3 {
                let log: Vec<_> = (0..count)
                    .map(|i| entry(Tone::ALL[i % tones], (i as i64) * 7_000))
                    .collect();
                let index = compute_at(&log, NOW);
                assert!(index <= FLOW_MAX);
            }
        }
    }

    #[test]
    fn test_future_timestamps_count_as_recent() {
        let log = vec![entry(Tone::Directive, -5_000)];
        assert_eq!(compute_at(&log, NOW), 12);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_flow_index(7), "07");
        assert_eq!(format_flow_index(99), "99");
    }
}
