use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter `{0}`")]
    Unknown(String),
    #[error("parameter `{name}` rejects non-finite value {value}")]
    NotFinite { name: String, value: f32 },
}

/// Tone mapping and bloom settings read by the renderers every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderParams {
    pub exposure: f32,
    pub bloom_strength: f32,
    pub bloom_threshold: f32,
    pub bloom_radius: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            exposure: 2.0,
            bloom_strength: 3.0,
            bloom_threshold: 0.521,
            bloom_radius: 0.47,
        }
    }
}

impl RenderParams {
    /// Exposure handed to the tone mapper.
    pub fn tone_mapping_exposure(&self) -> f32 {
        self.exposure.powi(4)
    }
}

/// One slider of the debug panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slider {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: Option<f32>,
}

impl Slider {
    fn constrain(&self, value: f32) -> f32 {
        let value = value.clamp(self.min, self.max);
        match self.step {
            Some(step) => (self.min + ((value - self.min) / step).round() * step).min(self.max),
            None => value,
        }
    }
}

pub const SLIDERS: [Slider; 4] = [
    Slider {
        name: "exposure",
        min: 0.1,
        max: 2.0,
        step: None,
    },
    Slider {
        name: "bloomThreshold",
        min: 0.0,
        max: 1.0,
        step: None,
    },
    Slider {
        name: "bloomStrength",
        min: 0.0,
        max: 6.0,
        step: None,
    },
    Slider {
        name: "bloomRadius",
        min: 0.0,
        max: 1.0,
        step: Some(0.01),
    },
];

/// Debug controls over [`RenderParams`]. Hidden until toggled.
#[derive(Debug, Clone, Default)]
pub struct DebugPanel {
    params: RenderParams,
    visible: bool,
    picker_color: String,
}

impl DebugPanel {
    /// `picker_color` seeds the color picker, usually the current hex color.
    pub fn new(params: RenderParams, picker_color: impl Into<String>) -> Self {
        Self {
            params,
            visible: false,
            picker_color: picker_color.into(),
        }
    }

    pub fn params(&self) -> RenderParams {
        self.params
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    pub fn picker_color(&self) -> &str {
        &self.picker_color
    }

    /// Records a new picker value and returns it for scene preview.
    pub fn pick_color(&mut self, style: impl Into<String>) -> &str {
        self.picker_color = style.into();
        &self.picker_color
    }

    pub fn sliders(&self) -> &'static [Slider] {
        &SLIDERS
    }

    /// One `name = value [min, max]` line per slider.
    pub fn describe(&self) -> Vec<String> {
        self.sliders()
            .iter()
            .filter_map(|slider| {
                let value = self.get(slider.name).ok()?;
                Some(format!(
                    "{} = {value} [{}, {}]",
                    slider.name, slider.min, slider.max
                ))
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Result<f32, ParamError> {
        match name {
            "exposure" => Ok(self.params.exposure),
            "bloomThreshold" => Ok(self.params.bloom_threshold),
            "bloomStrength" => Ok(self.params.bloom_strength),
            "bloomRadius" => Ok(self.params.bloom_radius),
            other => Err(ParamError::Unknown(other.to_string())),
        }
    }

    /// Sets a slider, clamping to its range. Returns the stored value.
    pub fn set(&mut self, name: &str, value: f32) -> Result<f32, ParamError> {
        let slider = SLIDERS
            .iter()
            .find(|slider| slider.name == name)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        if !value.is_finite() {
            return Err(ParamError::NotFinite {
                name: name.to_string(),
                value,
            });
        }
        let value = slider.constrain(value);
        let field = match name {
            "exposure" => &mut self.params.exposure,
            "bloomThreshold" => &mut self.params.bloom_threshold,
            "bloomStrength" => &mut self.params.bloom_strength,
            _ => &mut self.params.bloom_radius,
        };
        *field = value;
        log::debug!("{name} = {value}");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_page() {
        let panel = DebugPanel::new(RenderParams::default(), "#2b4754");
        assert!(!panel.is_visible());
        assert_eq!(panel.get("bloomThreshold").unwrap(), 0.521);
        assert_eq!(panel.params().tone_mapping_exposure(), 16.0);
        assert_eq!(panel.picker_color(), "#2b4754");
    }

    #[test]
    fn sliders_clamp_to_their_ranges() {
        let mut panel = DebugPanel::default();
        assert_eq!(panel.set("exposure", 0.0).unwrap(), 0.1);
        assert_eq!(panel.set("bloomStrength", 9.0).unwrap(), 6.0);
        assert_eq!(panel.set("bloomThreshold", -1.0).unwrap(), 0.0);
        assert_eq!(panel.params().bloom_strength, 6.0);
    }

    #[test]
    fn describe_lists_every_slider_with_its_range() {
        let panel = DebugPanel::default();
        let lines = panel.describe();
        assert_eq!(lines.len(), SLIDERS.len());
        assert!(lines.contains(&"bloomStrength = 3 [0, 6]".to_string()));
        assert!(lines.contains(&"exposure = 2 [0.1, 2]".to_string()));
    }

    #[test]
    fn radius_snaps_to_step() {
        let mut panel = DebugPanel::default();
        let value = panel.set("bloomRadius", 0.4736).unwrap();
        assert!((value - 0.47).abs() < 1e-5);
    }

    #[test]
    fn rejects_unknown_and_non_finite_values() {
        let mut panel = DebugPanel::default();
        assert_eq!(
            panel.set("gamma", 1.0),
            Err(ParamError::Unknown("gamma".into()))
        );
        assert!(matches!(
            panel.set("exposure", f32::NAN),
            Err(ParamError::NotFinite { .. })
        ));
        assert!(panel.get("gamma").is_err());
    }

    #[test]
    fn toggle_flips_visibility() {
        let mut panel = DebugPanel::default();
        assert!(panel.toggle());
        assert!(!panel.toggle());
    }
}
