use crate::color::{parse_color_style, ColorError};
use crate::controller::ColorSink;
use crate::scene_model::SceneModel;

/// Which part of the scene a [`SceneSink`] recolors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneTarget {
    Background,
    /// Color of the light at this index in the scene.
    LightColor(usize),
    /// Emissive color of the mesh at this index in the scene.
    Emissive(usize),
}

/// Writes colors into the shared [`SceneModel`].
#[derive(Debug, Clone)]
pub struct SceneSink {
    model: SceneModel,
    target: SceneTarget,
    label: String,
}

impl SceneSink {
    pub fn new(model: SceneModel, target: SceneTarget) -> Self {
        let label = match &target {
            SceneTarget::Background => "scene background".to_string(),
            SceneTarget::LightColor(index) => format!("light color of object {index}"),
            SceneTarget::Emissive(index) => format!("emissive color of object {index}"),
        };
        Self {
            model,
            target,
            label,
        }
    }

}

impl ColorSink for SceneSink {
    fn apply(&self, style: &str) -> Result<(), ColorError> {
        let color = parse_color_style(style)?;
        let found = match &self.target {
            SceneTarget::Background => {
                self.model.set_background(color);
                true
            }
            SceneTarget::LightColor(index) => self.model.set_color(*index, color),
            SceneTarget::Emissive(index) => self.model.set_emissive(*index, color),
        };
        if !found {
            log::warn!("{} no longer exists in the scene", self.label);
        }
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::{Scene, DEFAULT_SCENE_XML};

    fn model() -> SceneModel {
        SceneModel::from_scene(&Scene::from_xml(DEFAULT_SCENE_XML).unwrap())
    }

    #[test]
    fn applies_to_each_target() {
        let model = model();
        SceneSink::new(model.clone(), SceneTarget::Background)
            .apply("#ff0000")
            .unwrap();
        SceneSink::new(model.clone(), SceneTarget::LightColor(0))
            .apply("#00ff00")
            .unwrap();
        SceneSink::new(model.clone(), SceneTarget::Emissive(2))
            .apply("#0000ff")
            .unwrap();

        assert_eq!(model.background(), Vec3::X);
        assert_eq!(model.get("PointLight").unwrap().color, Vec3::Y);
        assert_eq!(model.get("Monocromatica").unwrap().emissive, Some(Vec3::Z));
    }

    #[test]
    fn applying_twice_matches_applying_once() {
        let once = model();
        let twice = model();
        let style = "hsla(200, 32%, 25%, 1)";
        SceneSink::new(once.clone(), SceneTarget::Emissive(2))
            .apply(style)
            .unwrap();
        let sink = SceneSink::new(twice.clone(), SceneTarget::Emissive(2));
        sink.apply(style).unwrap();
        sink.apply(style).unwrap();
        assert_eq!(once.all_objects(), twice.all_objects());
    }

    #[test]
    fn invalid_style_leaves_model_untouched() {
        let model = model();
        let before = model.background();
        let sink = SceneSink::new(model.clone(), SceneTarget::Background);
        assert!(sink.apply("not-a-color").is_err());
        assert_eq!(model.background(), before);
    }
}
