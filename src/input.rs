use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::color::normalize_hue;
use crate::controller::ColorController;

/// Pointer data as delivered by the platform, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPointer {
    Mouse { x: f64, y: f64 },
    /// Active touch points in page order; the first one drives the dial.
    Touch(Vec<DVec2>),
}

/// Reduces mouse and touch input to a single pointer position.
pub fn pointer_sample(raw: &RawPointer) -> Option<DVec2> {
    let sample = match raw {
        RawPointer::Mouse { x, y } => Some(DVec2::new(*x, *y)),
        RawPointer::Touch(touches) => touches.first().copied(),
    };
    sample.filter(|point| point.is_finite())
}

/// Angle of `pointer` around `pivot` in whole degrees, `[0, 360)`.
///
/// Coordinates are screen space (y grows downward). Straight up is 0 and
/// the angle grows clockwise.
pub fn hue_from_pointer(pivot: DVec2, pointer: DVec2) -> f64 {
    let delta = pointer - pivot;
    let angle = (delta.y.atan2(delta.x).to_degrees() + 90.0).round();
    normalize_hue(angle)
}

/// What the pointer was over when the event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerTarget {
    Handle,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DragState {
    Idle,
    Dragging,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    /// Mouse-down or touch-start.
    Down,
    /// Mouse-up, touch-end or touch-cancel.
    Up,
    Move {
        target: PointerTarget,
        pointer: RawPointer,
    },
}

/// Drag state of the circular hue widget.
#[derive(Debug, Clone)]
pub struct HueDial {
    pivot: DVec2,
    state: DragState,
}

impl HueDial {
    pub fn new(pivot: DVec2) -> Self {
        Self {
            pivot,
            state: DragState::Idle,
        }
    }

    /// Moves the pivot, e.g. after the widget was laid out again.
    pub fn set_pivot(&mut self, pivot: DVec2) {
        self.pivot = pivot;
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Advances the state machine and returns the new hue when the event
    /// should recolor the page.
    pub fn handle(&mut self, event: &PointerEvent) -> Option<f64> {
        match event {
            PointerEvent::Down => {
                self.state = DragState::Dragging;
                None
            }
            PointerEvent::Up => {
                self.state = DragState::Idle;
                None
            }
            PointerEvent::Move { target, pointer } => {
                if self.state != DragState::Dragging || *target != PointerTarget::Handle {
                    return None;
                }
                pointer_sample(pointer).map(|sample| hue_from_pointer(self.pivot, sample))
            }
        }
    }

    /// Feeds `event` through the dial and into `controller`. Returns whether
    /// the hue changed.
    pub fn drive(&mut self, event: &PointerEvent, controller: &mut ColorController) -> bool {
        match self.handle(event) {
            Some(hue) => {
                controller.set_hue(hue);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Hsla;

    const PIVOT: DVec2 = DVec2::new(100.0, 100.0);

    fn mouse(x: f64, y: f64) -> RawPointer {
        RawPointer::Mouse { x, y }
    }

    fn drag_to(target: PointerTarget, x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            target,
            pointer: mouse(x, y),
        }
    }

    #[test]
    fn cardinal_directions_map_to_quarter_turns() {
        assert_eq!(hue_from_pointer(PIVOT, DVec2::new(100.0, 40.0)), 0.0);
        assert_eq!(hue_from_pointer(PIVOT, DVec2::new(160.0, 100.0)), 90.0);
        assert_eq!(hue_from_pointer(PIVOT, DVec2::new(100.0, 160.0)), 180.0);
        assert_eq!(hue_from_pointer(PIVOT, DVec2::new(40.0, 100.0)), 270.0);
    }

    #[test]
    fn angles_are_whole_degrees_in_range() {
        for step in 0..72 {
            let theta = (step as f64 * 5.0 + 0.3).to_radians();
            let pointer = PIVOT + DVec2::new(theta.cos(), theta.sin()) * 50.0;
            let hue = hue_from_pointer(PIVOT, pointer);
            assert!((0.0..360.0).contains(&hue), "{hue}");
            assert_eq!(hue, hue.round());
        }
    }

    #[test]
    fn touch_and_mouse_normalize_to_the_same_sample() {
        let touch = RawPointer::Touch(vec![DVec2::new(3.0, 4.0), DVec2::new(9.0, 9.0)]);
        assert_eq!(pointer_sample(&touch), pointer_sample(&mouse(3.0, 4.0)));
        assert_eq!(pointer_sample(&RawPointer::Touch(Vec::new())), None);
        assert_eq!(pointer_sample(&mouse(f64::NAN, 0.0)), None);
    }

    #[test]
    fn dial_cycles_between_idle_and_dragging() {
        let mut dial = HueDial::new(PIVOT);
        assert_eq!(dial.state(), DragState::Idle);
        assert_eq!(dial.handle(&drag_to(PointerTarget::Handle, 160.0, 100.0)), None);

        dial.handle(&PointerEvent::Down);
        assert_eq!(dial.state(), DragState::Dragging);
        assert_eq!(
            dial.handle(&drag_to(PointerTarget::Handle, 160.0, 100.0)),
            Some(90.0)
        );

        dial.handle(&PointerEvent::Up);
        assert_eq!(dial.state(), DragState::Idle);
        assert_eq!(dial.handle(&drag_to(PointerTarget::Handle, 100.0, 160.0)), None);
    }

    #[test]
    fn dragging_over_another_element_leaves_color_alone() {
        let mut controller = ColorController::new(Hsla::new(42.0, 32.0, 25.0, 1.0));
        let mut dial = HueDial::new(PIVOT);
        dial.handle(&PointerEvent::Down);

        assert!(!dial.drive(&drag_to(PointerTarget::Other, 160.0, 100.0), &mut controller));
        assert_eq!(controller.hue(), 42.0);

        let touch = PointerEvent::Move {
            target: PointerTarget::Handle,
            pointer: RawPointer::Touch(vec![DVec2::new(100.0, 160.0)]),
        };
        assert!(dial.drive(&touch, &mut controller));
        assert_eq!(controller.hue(), 180.0);
    }
}
