use crate::config::IngestConfig;
use chrono::Utc;
use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;

/// Time-windowed fingerprint cache that collapses rapid repeated
/// submissions of the same detection.
///
/// Sliding window: every check records the fingerprint, so a burst keeps
/// the window open until it goes quiet. Eviction runs as a side effect of
/// inserts once the table exceeds capacity; there is no background task.
pub struct DuplicateSuppressor {
    seen: Mutex<HashMap<String, i64>>,
    window_ms: i64,
    capacity: usize,
    evict_after_ms: i64,
}

impl DuplicateSuppressor {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            window_ms: config.dedup_window_ms,
            capacity: config.dedup_capacity,
            evict_after_ms: config.dedup_evict_after_ms,
        }
    }

    /// Check-and-record: reports whether the fingerprint was seen inside
    /// the window, and marks it seen now either way.
    pub fn is_duplicate(&self, fingerprint: &str) -> bool {
        self.check_at(fingerprint, Utc::now().timestamp_millis())
    }

    pub(crate) fn check_at(&self, fingerprint: &str, now_ms: i64) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let duplicate = seen
            .get(fingerprint)
            .map(|&last| now_ms - last < self.window_ms)
            .unwrap_or(false);

        seen.insert(fingerprint.to_string(), now_ms);

        if seen.len() > self.capacity {
            let evict_after = self.evict_after_ms;
            let before = seen.len();
            seen.retain(|_, &mut last| now_ms - last < evict_after);
            debug!(
                "Swept fingerprint table: {} -> {} entries",
                before,
                seen.len()
            );
        }

        duplicate
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

/// Fingerprint for plain detection submissions. Timestamp truncated to
/// the minute bucket, so two detections differing only in seconds collide.
pub fn detection_fingerprint(
    session_id: &str,
    object_type: &str,
    device_id: &str,
    timestamp: &str,
) -> String {
    let bucket: String = timestamp.chars().take(16).collect();
    format!("{}{}{}{}", session_id, object_type, device_id, bucket)
}

/// Fingerprint gating the companion record synthesized from a bus-image
/// upload. Coarser hour bucket, independent key space.
pub fn bus_image_fingerprint(session_id: &str, device_id: &str, timestamp: &str) -> String {
    let bucket: String = timestamp.chars().take(13).collect();
    format!("busimg-{}{}{}", session_id, device_id, bucket)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suppressor() -> DuplicateSuppressor {
        DuplicateSuppressor::new(&IngestConfig::default())
    }

    #[test]
    fn first_sighting_is_not_a_duplicate() {
        let dedup = suppressor();
        assert!(!dedup.check_at("fp-1", 1_000));
    }

    #[test]
    fn repeat_inside_window_is_suppressed() {
        let dedup = suppressor();
        assert!(!dedup.check_at("fp-1", 1_000));
        assert!(dedup.check_at("fp-1", 5_000));
        assert!(dedup.check_at("fp-1", 10_999));
    }

    #[test]
    fn repeat_after_window_is_admitted() {
        let dedup = suppressor();
        assert!(!dedup.check_at("fp-1", 1_000));
        assert!(!dedup.check_at("fp-1", 11_001));
    }

    #[test]
    fn window_slides_on_every_observation() {
        let dedup = suppressor();
        assert!(!dedup.check_at("fp-1", 0));
        // Each duplicate refreshes the timer, keeping the burst suppressed
        assert!(dedup.check_at("fp-1", 8_000));
        assert!(dedup.check_at("fp-1", 16_000));
        // Quiet period longer than the window finally readmits the key
        assert!(!dedup.check_at("fp-1", 27_000));
    }

    #[test]
    fn distinct_fingerprints_do_not_interfere() {
        let dedup = suppressor();
        assert!(!dedup.check_at("fp-1", 1_000));
        assert!(!dedup.check_at("fp-2", 1_000));
    }

    #[test]
    fn sweep_evicts_stale_entries_past_capacity() {
        let dedup = suppressor();
        for i in 0..100 {
            dedup.check_at(&format!("old-{}", i), 0);
        }
        assert_eq!(dedup.len(), 100);
        // Entry 101 arrives 30s later, tripping the sweep over the stale set
        assert!(!dedup.check_at("fresh", 30_000));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn sweep_keeps_entries_younger_than_eviction_age() {
        let dedup = suppressor();
        for i in 0..100 {
            dedup.check_at(&format!("old-{}", i), 0);
        }
        dedup.check_at("young", 20_000);
        // Sweep at 30s: the 0ms entries age out, "young" (10s old) survives
        dedup.check_at("trigger", 30_000);
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn detection_fingerprint_buckets_by_minute() {
        let a = detection_fingerprint("s1", "car", "d1", "2024-05-01 08:30:15");
        let b = detection_fingerprint("s1", "car", "d1", "2024-05-01 08:30:59");
        let c = detection_fingerprint("s1", "car", "d1", "2024-05-01 08:31:00");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn bus_image_fingerprint_buckets_by_hour() {
        let a = bus_image_fingerprint("s1", "d1", "2024-05-01 08:30:15");
        let b = bus_image_fingerprint("s1", "d1", "2024-05-01 08:59:59");
        let c = bus_image_fingerprint("s1", "d1", "2024-05-01 09:00:00");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("busimg-"));
    }
}
