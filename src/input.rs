use glam::Vec2;

use crate::viewport::ViewportProvider;

/// Last known pointer displacement from the viewport center, already scaled
/// by the tracker sensitivity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub offset_x: f32,
    pub offset_y: f32,
}

impl PointerState {
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.offset_x, self.offset_y)
    }
}

/// Turns raw pointer-move events into a [`PointerState`].
#[derive(Debug, Clone)]
pub struct PointerTracker {
    sensitivity: f32,
    state: PointerState,
}

impl PointerTracker {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            state: PointerState::default(),
        }
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Replaces the pointer state from an event at `(x, y)` in viewport pixels.
    ///
    /// Positions outside the viewport are accepted as-is.
    pub fn on_pointer_move(&mut self, x: f32, y: f32, viewport: &impl ViewportProvider) {
        let (dx, dy) = viewport.offset_from_center(x, y);
        self.state = PointerState {
            offset_x: dx * self.sensitivity,
            offset_y: dy * self.sensitivity,
        };
    }

    pub fn state(&self) -> PointerState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::Viewport;

    #[test]
    fn starts_centered() {
        let tracker = PointerTracker::new(0.05);
        assert_eq!(tracker.state(), PointerState::default());
    }

    #[test]
    fn scales_offset_from_center() {
        let mut tracker = PointerTracker::new(0.05);
        tracker.on_pointer_move(600.0, 100.0, &Viewport::new(800, 600));
        assert_eq!(tracker.state().as_vec2(), Vec2::new(10.0, -10.0));
    }

    #[test]
    fn second_event_overwrites_first() {
        let viewport = Viewport::new(800, 600);
        let mut tracker = PointerTracker::new(0.05);
        tracker.on_pointer_move(0.0, 0.0, &viewport);
        tracker.on_pointer_move(500.0, 400.0, &viewport);
        assert_eq!(
            tracker.state(),
            PointerState {
                offset_x: 5.0,
                offset_y: 5.0
            }
        );
    }

    #[test]
    fn positions_off_canvas_are_not_clamped() {
        let mut tracker = PointerTracker::new(0.05);
        tracker.on_pointer_move(-1200.0, 5000.0, &Viewport::new(800, 600));
        assert_eq!(tracker.state().offset_x, -80.0);
        assert_eq!(tracker.state().offset_y, 235.0);
    }
}
