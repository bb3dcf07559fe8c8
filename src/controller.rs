use log::{debug, warn};

use crate::color::{clamp_percent, normalize_hue, ColorError, Hsla};

/// Anything that accepts a color string and updates its own visual state.
///
/// Applying the same string twice must leave the sink in the same state as
/// applying it once.
pub trait ColorSink {
    fn apply(&self, style: &str) -> Result<(), ColorError>;

    /// Short name used in log messages.
    fn label(&self) -> &str {
        "sink"
    }
}

impl<T> ColorSink for Box<T>
where
    T: ColorSink + ?Sized,
{
    fn apply(&self, style: &str) -> Result<(), ColorError> {
        (**self).apply(style)
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

/// Where a sink lives. The debug color picker only recolors the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkScope {
    Scene,
    Page,
}

struct RegisteredSink {
    scope: SinkScope,
    sink: Box<dyn ColorSink>,
}

/// Owns the current [`Hsla`] and pushes every change to the registered sinks.
pub struct ColorController {
    color: Hsla,
    sinks: Vec<RegisteredSink>,
}

impl ColorController {
    pub fn new(color: Hsla) -> Self {
        Self {
            color: Hsla::new(color.hue, color.saturation, color.lightness, color.alpha),
            sinks: Vec::new(),
        }
    }

    pub fn register(&mut self, scope: SinkScope, sink: impl ColorSink + 'static) {
        self.sinks.push(RegisteredSink {
            scope,
            sink: Box::new(sink),
        });
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn color(&self) -> Hsla {
        self.color
    }

    pub fn hue(&self) -> f64 {
        self.color.hue
    }

    /// Stores `angle` wrapped into `[0, 360)`. Non-finite angles are ignored.
    pub fn set_hue(&mut self, angle: f64) {
        if !angle.is_finite() {
            debug!("ignoring non-finite hue {angle}");
            return;
        }
        self.color.hue = normalize_hue(angle);
        self.propagate();
    }

    pub fn set_saturation(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.color.saturation = clamp_percent(value);
        self.propagate();
    }

    pub fn set_lightness(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.color.lightness = clamp_percent(value);
        self.propagate();
    }

    pub fn set_alpha(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.color.alpha = value.clamp(0.0, 1.0);
        self.propagate();
    }

    pub fn hsl_string(&self) -> String {
        self.color.to_hsl_string()
    }

    pub fn hex_string(&self) -> String {
        self.color.to_hex_string()
    }

    /// Pushes the current HSL string to every sink.
    pub fn propagate(&self) {
        let style = self.hsl_string();
        self.push(&style, |_| true);
    }

    /// Recolors scene sinks only, leaving the stored color untouched.
    pub fn preview_scene(&self, style: &str) {
        self.push(style, |scope| scope == SinkScope::Scene);
    }

    fn push(&self, style: &str, filter: impl Fn(SinkScope) -> bool) {
        for entry in self.sinks.iter().filter(|entry| filter(entry.scope)) {
            if let Err(err) = entry.sink.apply(style) {
                warn!("{} rejected {style}: {err}", entry.sink.label());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone, Default)]
    struct Recorder {
        applied: Rc<RefCell<Vec<String>>>,
    }

    impl ColorSink for Recorder {
        fn apply(&self, style: &str) -> Result<(), ColorError> {
            self.applied.borrow_mut().push(style.to_string());
            Ok(())
        }
    }

    struct Rejecting;

    impl ColorSink for Rejecting {
        fn apply(&self, style: &str) -> Result<(), ColorError> {
            Err(ColorError::Unsupported(style.to_string()))
        }
    }

    fn controller() -> ColorController {
        ColorController::new(Hsla::new(200.0, 32.0, 25.0, 1.0))
    }

    #[test]
    fn hue_is_periodic() {
        let mut a = controller();
        let mut b = controller();
        for hue in [0.0, 45.0, 123.0, 359.0] {
            a.set_hue(hue);
            for k in [-3.0, -1.0, 1.0, 7.0] {
                b.set_hue(hue + 360.0 * k);
                assert_eq!(a.hsl_string(), b.hsl_string());
            }
        }
    }

    #[test]
    fn saturation_and_lightness_are_clamped() {
        let mut controller = controller();
        controller.set_saturation(150.0);
        assert_eq!(controller.color().saturation, 100.0);
        controller.set_saturation(-10.0);
        assert_eq!(controller.color().saturation, 0.0);
        controller.set_lightness(101.0);
        assert_eq!(controller.color().lightness, 100.0);
        controller.set_alpha(3.0);
        assert_eq!(controller.color().alpha, 1.0);
    }

    #[test]
    fn every_mutation_reaches_every_sink() {
        let mut controller = controller();
        let first = Recorder::default();
        let second = Recorder::default();
        controller.register(SinkScope::Scene, first.clone());
        controller.register(SinkScope::Page, second.clone());

        controller.set_hue(-30.0);
        controller.set_lightness(50.0);

        let expected = vec![
            "hsla(330, 32%, 25%, 1)".to_string(),
            "hsla(330, 32%, 50%, 1)".to_string(),
        ];
        assert_eq!(*first.applied.borrow(), expected);
        assert_eq!(*second.applied.borrow(), expected);
    }

    #[test]
    fn non_finite_hue_is_ignored() {
        let mut controller = controller();
        let recorder = Recorder::default();
        controller.register(SinkScope::Page, recorder.clone());
        controller.set_hue(f64::NAN);
        controller.set_hue(f64::INFINITY);
        assert_eq!(controller.hue(), 200.0);
        assert!(recorder.applied.borrow().is_empty());
    }

    #[test]
    fn failing_sink_does_not_stop_propagation() {
        let mut controller = controller();
        let recorder = Recorder::default();
        controller.register(SinkScope::Scene, Rejecting);
        controller.register(SinkScope::Scene, recorder.clone());
        controller.propagate();
        assert_eq!(recorder.applied.borrow().len(), 1);
    }

    #[test]
    fn scene_preview_skips_page_sinks() {
        let mut controller = controller();
        let scene = Recorder::default();
        let page = Recorder::default();
        controller.register(SinkScope::Scene, scene.clone());
        controller.register(SinkScope::Page, page.clone());

        controller.preview_scene("#ff0000");

        assert_eq!(*scene.applied.borrow(), vec!["#ff0000".to_string()]);
        assert!(page.applied.borrow().is_empty());
        assert_eq!(controller.hue(), 200.0);
    }
}
