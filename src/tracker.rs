//! Behavior signal accumulation.
//!
//! Signals only ever grow during a page load. Consumers get snapshots; the
//! tracker is the only writer.

use std::collections::HashMap;

use ngw_generation::BehaviorSignals;
use tokio::time::Instant;

/// A scroll sample waiting for the next animation frame.
#[derive(Debug, Clone, PartialEq)]
struct PendingScroll {
    page: String,
    fraction: f64,
}

#[derive(Debug, Default)]
pub struct BehaviorTracker {
    signals: BehaviorSignals,
    /// Running dwell timers keyed by section name
    timers: HashMap<String, Instant>,
    /// Latest scroll sample since the last frame
    pending_scroll: Option<PendingScroll>,
}

impl BehaviorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page_visit(&mut self, page: &str) {
        push_unique(&mut self.signals.pages_visited, page);
    }

    pub fn record_click(&mut self, element: &str) {
        push_unique(&mut self.signals.clicked_elements, element);
    }

    /// Start (or restart) the dwell timer for a section.
    pub fn start_section(&mut self, section: &str) {
        self.timers.insert(section.to_string(), Instant::now());
    }

    /// Stop a dwell timer and add the elapsed time. Unknown sections are ignored.
    pub fn stop_section(&mut self, section: &str) {
        let Some(started) = self.timers.remove(section) else {
            tracing::trace!(section, "stop_section without start");
            return;
        };
        let elapsed = started.elapsed().as_secs_f64();
        *self
            .signals
            .time_on_sections
            .entry(section.to_string())
            .or_insert(0.0) += elapsed;
    }

    /// Stop every running timer (page is being replaced).
    pub fn stop_all_sections(&mut self) {
        let running: Vec<String> = self.timers.keys().cloned().collect();
        for section in running {
            self.stop_section(&section);
        }
    }

    /// Queue a scroll sample.
    ///
    /// Returns `true` when the caller must request an animation frame; further
    /// samples before that frame only overwrite the queued one.
    pub fn on_scroll(&mut self, page: &str, fraction: f64) -> bool {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let needs_frame = self.pending_scroll.is_none();
        self.pending_scroll = Some(PendingScroll {
            page: page.to_string(),
            fraction,
        });
        needs_frame
    }

    /// Commit the queued scroll sample.
    pub fn on_animation_frame(&mut self) {
        let Some(sample) = self.pending_scroll.take() else {
            return;
        };
        let depth = self
            .signals
            .scroll_depth
            .entry(sample.page)
            .or_insert(0.0);
        if sample.fraction > *depth {
            *depth = sample.fraction;
        }
    }

    /// Immutable copy of the signals gathered so far.
    pub fn snapshot(&self) -> BehaviorSignals {
        self.signals.clone()
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_visits_and_clicks_have_set_semantics() {
        let mut tracker = BehaviorTracker::new();
        tracker.record_page_visit("landing");
        tracker.record_page_visit("segment_pricing");
        tracker.record_page_visit("landing");
        tracker.record_click("segment:pricing");
        tracker.record_click("segment:pricing");

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.pages_visited, vec!["landing", "segment_pricing"]);
        assert_eq!(snapshot.clicked_elements, vec!["segment:pricing"]);
    }

    #[test]
    fn test_scroll_is_throttled_to_frames_and_keeps_max() {
        let mut tracker = BehaviorTracker::new();
        assert!(tracker.on_scroll("landing", 0.4));
        assert!(!tracker.on_scroll("landing", 0.7));
        tracker.on_animation_frame();
        assert_eq!(tracker.snapshot().scroll_depth["landing"], 0.7);

        assert!(tracker.on_scroll("landing", 0.2));
        tracker.on_animation_frame();
        assert_eq!(tracker.snapshot().scroll_depth["landing"], 0.7);

        tracker.on_scroll("landing", 3.0);
        tracker.on_animation_frame();
        assert_eq!(tracker.snapshot().scroll_depth["landing"], 1.0);
    }

    #[test]
    fn test_frame_without_scroll_is_noop() {
        let mut tracker = BehaviorTracker::new();
        tracker.on_animation_frame();
        assert!(tracker.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dwell_time_accumulates() {
        let mut tracker = BehaviorTracker::new();
        tracker.start_section("pricing-table");
        tokio::time::advance(Duration::from_secs(3)).await;
        tracker.stop_section("pricing-table");
        tracker.start_section("pricing-table");
        tokio::time::advance(Duration::from_secs(2)).await;
        tracker.stop_section("pricing-table");

        let secs = tracker.snapshot().time_on_sections["pricing-table"];
        assert!((secs - 5.0).abs() < 0.01, "got {}", secs);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_excludes_running_timers() {
        let mut tracker = BehaviorTracker::new();
        tracker.start_section("hero");
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(tracker.snapshot().time_on_sections.is_empty());
        tracker.stop_all_sections();
        assert!(tracker.snapshot().time_on_sections.contains_key("hero"));
        tracker.stop_section("hero");
    }

    proptest! {
        #[test]
        fn prop_scroll_depth_is_bounded_running_max(samples in proptest::collection::vec(-2.0f64..3.0, 1..40)) {
            let mut tracker = BehaviorTracker::new();
            let mut expected = 0.0f64;
            for sample in &samples {
                tracker.on_scroll("landing", *sample);
                tracker.on_animation_frame();
                expected = expected.max(sample.clamp(0.0, 1.0));
            }
            let depth = tracker.snapshot().scroll_depth["landing"];
            prop_assert!((0.0..=1.0).contains(&depth));
            prop_assert_eq!(depth, expected);
        }
    }
}
