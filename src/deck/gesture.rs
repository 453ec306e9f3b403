use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;
use crate::ideas::types::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Transient hint shown while a card is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragFeedback {
    WouldLike,
    WouldDislike,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragUpdate {
    /// Card offset to render; (0,0) while the gesture is not a horizontal swipe.
    pub offset: Point,
    pub feedback: Option<DragFeedback>,
    /// The host should cancel native scrolling for this move.
    pub suppress_scroll: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Commit(Direction),
    SnapBack,
}

/// Tracks one pointer (mouse or touch) drag over the top card.
pub struct PointerTracker {
    config: GestureConfig,
    origin: Option<Point>,
    offset: Point,
    horizontal: bool,
}

impl PointerTracker {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            origin: None,
            offset: Point::default(),
            horizontal: false,
        }
    }

    pub fn with_default() -> Self {
        Self::new(GestureConfig::default())
    }

    pub fn reset(&mut self) {
        self.origin = None;
        self.offset = Point::default();
        self.horizontal = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.origin.is_some()
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Delay between a committed swipe and the deck advancing.
    pub fn exit_delay(&self) -> Duration {
        Duration::from_millis(self.config.exit_delay_ms)
    }

    pub fn press(&mut self, origin: Point) {
        self.reset();
        self.origin = Some(origin);
    }

    /// Moves without a prior press are ignored and report a neutral update.
    pub fn move_to(&mut self, point: Point) -> DragUpdate {
        let Some(origin) = self.origin else {
            return DragUpdate::neutral();
        };
        let dx = point.x - origin.x;
        let dy = point.y - origin.y;

        if !self.horizontal {
            self.horizontal = dx.abs() > dy.abs() && dx.abs() > self.config.horizontal_threshold;
        }
        if !self.horizontal {
            self.offset = Point::default();
            return DragUpdate::neutral();
        }

        self.offset = Point::new(dx, dy);
        let feedback = if dx.abs() > self.config.feedback_threshold {
            Some(if dx > 0.0 {
                DragFeedback::WouldLike
            } else {
                DragFeedback::WouldDislike
            })
        } else {
            None
        };

        DragUpdate {
            offset: self.offset,
            feedback,
            suppress_scroll: true,
        }
    }

    /// Ends the drag. The tracker is back at rest afterwards either way.
    pub fn release(&mut self) -> Release {
        if self.origin.is_none() {
            return Release::SnapBack;
        }
        let dx = self.offset.x;
        self.reset();

        if dx.abs() > self.config.commit_threshold {
            let direction = Direction::from_offset(dx);
            tracing::debug!(dx, ?direction, "drag committed");
            Release::Commit(direction)
        } else {
            tracing::debug!(dx, "drag snapped back");
            Release::SnapBack
        }
    }
}

impl DragUpdate {
    fn neutral() -> Self {
        Self {
            offset: Point::default(),
            feedback: None,
            suppress_scroll: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(tracker: &mut PointerTracker, path: &[(f64, f64)]) -> Vec<DragUpdate> {
        tracker.press(Point::new(200.0, 300.0));
        path.iter()
            .map(|(dx, dy)| tracker.move_to(Point::new(200.0 + dx, 300.0 + dy)))
            .collect()
    }

    #[test]
    fn small_moves_are_not_swipes() {
        let mut t = PointerTracker::with_default();
        let updates = drag(&mut t, &[(15.0, 0.0)]);
        assert!(!updates[0].suppress_scroll);
        assert_eq!(updates[0].offset, Point::default());
    }

    #[test]
    fn vertical_moves_keep_scrolling() {
        let mut t = PointerTracker::with_default();
        let updates = drag(&mut t, &[(30.0, 80.0)]);
        assert!(!updates[0].suppress_scroll);
        assert_eq!(updates[0].feedback, None);
        assert_eq!(t.release(), Release::SnapBack);
    }

    #[test]
    fn horizontal_swipe_suppresses_scroll_and_gives_feedback() {
        let mut t = PointerTracker::with_default();
        let updates = drag(&mut t, &[(30.0, 5.0), (60.0, 5.0), (-70.0, 10.0)]);
        assert!(updates[0].suppress_scroll);
        assert_eq!(updates[0].feedback, None);
        assert_eq!(updates[1].feedback, Some(DragFeedback::WouldLike));
        assert_eq!(updates[2].feedback, Some(DragFeedback::WouldDislike));
        assert_eq!(updates[2].offset, Point::new(-70.0, 10.0));
    }

    #[test]
    fn release_beyond_threshold_commits() {
        let mut t = PointerTracker::with_default();
        drag(&mut t, &[(40.0, 0.0), (130.0, 10.0)]);
        assert_eq!(t.release(), Release::Commit(Direction::Right));

        drag(&mut t, &[(-40.0, 0.0), (-101.0, 0.0)]);
        assert_eq!(t.release(), Release::Commit(Direction::Left));
        assert!(!t.is_dragging());
    }

    #[test]
    fn release_at_threshold_snaps_back() {
        let mut t = PointerTracker::with_default();
        drag(&mut t, &[(40.0, 0.0), (100.0, 0.0)]);
        assert_eq!(t.release(), Release::SnapBack);
        assert_eq!(t.offset(), Point::default());
    }

    #[test]
    fn release_without_press_snaps_back() {
        let mut t = PointerTracker::with_default();
        assert_eq!(t.move_to(Point::new(500.0, 0.0)).offset, Point::default());
        assert_eq!(t.release(), Release::SnapBack);
    }

    #[test]
    fn custom_thresholds_apply() {
        let mut t = PointerTracker::new(GestureConfig {
            horizontal_threshold: 5.0,
            feedback_threshold: 10.0,
            commit_threshold: 20.0,
            exit_delay_ms: 0,
        });
        let updates = drag(&mut t, &[(25.0, 0.0)]);
        assert_eq!(updates[0].feedback, Some(DragFeedback::WouldLike));
        assert_eq!(t.release(), Release::Commit(Direction::Right));
        assert_eq!(t.exit_delay(), Duration::ZERO);
    }
}
