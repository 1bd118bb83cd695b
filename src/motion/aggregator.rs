//! # Intent Aggregator
//!
//! Folds sparse single-axis updates into a dense two-axis intent vector.
//!
//! Each update may carry a new value for X, Y, both, or neither. A coordinate
//! that is missing from an update keeps its previous value. Until both axes
//! have been reported at least once the aggregate is incomplete and nothing
//! downstream should act on it.
//!
//! ## Usage
//!
//! ```
//! use plotjog::motion::aggregator::{IntentAggregator, IntentUpdate};
//!
//! let mut aggregator = IntentAggregator::new();
//! aggregator.apply(IntentUpdate::x(0.5));
//! assert_eq!(aggregator.complete(), None);
//!
//! aggregator.apply(IntentUpdate::y(-0.5));
//! assert_eq!(aggregator.complete(), Some((0.5, -0.5)));
//! ```

use crate::joystick::{AxisChange, AXIS_X, AXIS_Y};

/// A partial update to the intent vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntentUpdate {
    pub x: Option<f32>,
    pub y: Option<f32>,
}

impl IntentUpdate {
    /// Update carrying only an X value.
    #[must_use]
    pub fn x(value: f32) -> Self {
        Self { x: Some(value), y: None }
    }

    /// Update carrying only a Y value.
    #[must_use]
    pub fn y(value: f32) -> Self {
        Self { x: None, y: Some(value) }
    }

    /// Builds an update from a stick axis change.
    ///
    /// Returns `None` for any axis other than the two stick axes.
    #[must_use]
    pub fn from_change(change: &AxisChange) -> Option<Self> {
        match change.axis {
            AXIS_X => Some(Self::x(change.value)),
            AXIS_Y => Some(Self::y(change.value)),
            _ => None,
        }
    }

    /// Combines a previous state with this update, coordinate by coordinate.
    #[must_use]
    pub fn fold_into(self, previous: IntentUpdate) -> IntentUpdate {
        IntentUpdate {
            x: self.x.or(previous.x),
            y: self.y.or(previous.y),
        }
    }
}

/// Running two-axis intent vector.
///
/// Owned exclusively by the producer side of the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentAggregator {
    current: IntentUpdate,
}

impl IntentAggregator {
    /// Creates an aggregator with both coordinates unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an update and returns the resulting (possibly partial) vector.
    pub fn apply(&mut self, update: IntentUpdate) -> IntentUpdate {
        self.current = update.fold_into(self.current);
        self.current
    }

    /// Returns the current vector, including unset coordinates.
    #[must_use]
    pub fn current(&self) -> IntentUpdate {
        self.current
    }

    /// Returns the dense `(x, y)` pair once both axes have been observed.
    #[must_use]
    pub fn complete(&self) -> Option<(f32, f32)> {
        match (self.current.x, self.current.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unset() {
        let aggregator = IntentAggregator::new();
        assert_eq!(aggregator.current(), IntentUpdate::default());
        assert_eq!(aggregator.complete(), None);
    }

    #[test]
    fn test_fold_replaces_supplied_coordinates() {
        let previous = IntentUpdate { x: Some(0.1), y: Some(0.2) };
        let update = IntentUpdate { x: Some(0.9), y: None };
        assert_eq!(
            update.fold_into(previous),
            IntentUpdate { x: Some(0.9), y: Some(0.2) }
        );
    }

    #[test]
    fn test_fold_empty_update_is_identity() {
        let previous = IntentUpdate { x: Some(-0.3), y: None };
        assert_eq!(IntentUpdate::default().fold_into(previous), previous);
    }

    #[test]
    fn test_only_x_updates_stay_incomplete() {
        let mut aggregator = IntentAggregator::new();
        for value in [0.1, 0.5, -1.0, 1.0] {
            aggregator.apply(IntentUpdate::x(value));
            assert_eq!(aggregator.complete(), None);
        }
        assert_eq!(aggregator.current().x, Some(1.0));
    }

    #[test]
    fn test_each_coordinate_tracks_latest_value() {
        let mut aggregator = IntentAggregator::new();
        let updates = [
            IntentUpdate::x(0.1),
            IntentUpdate::y(0.2),
            IntentUpdate::x(0.3),
            IntentUpdate::default(),
            IntentUpdate { x: Some(-0.4), y: Some(-0.5) },
            IntentUpdate::y(0.6),
        ];

        let mut last_x = None;
        let mut last_y = None;
        for update in updates {
            last_x = update.x.or(last_x);
            last_y = update.y.or(last_y);
            let state = aggregator.apply(update);
            assert_eq!(state.x, last_x);
            assert_eq!(state.y, last_y);
        }

        assert_eq!(aggregator.complete(), Some((-0.4, 0.6)));
    }

    #[test]
    fn test_from_change_maps_stick_axes() {
        let x = AxisChange { axis: AXIS_X, value: 0.25 };
        let y = AxisChange { axis: AXIS_Y, value: -0.75 };
        let other = AxisChange { axis: 2, value: 1.0 };

        assert_eq!(IntentUpdate::from_change(&x), Some(IntentUpdate::x(0.25)));
        assert_eq!(IntentUpdate::from_change(&y), Some(IntentUpdate::y(-0.75)));
        assert_eq!(IntentUpdate::from_change(&other), None);
    }
}
