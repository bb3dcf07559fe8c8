use std::cell::RefCell;
use std::rc::Weak;

use log::info;

use crate::camera::OrbitCamera;
use crate::color::{rgb_to_hex, Hsla};
use crate::controller::{ColorController, SinkScope};
use crate::params::{DebugPanel, RenderParams};
use crate::render::{FrameState, LightParams};
use crate::scene::{Scene, SceneBindings, SceneError, SceneObject};
use crate::scene_model::SceneModel;
use crate::sink::{SceneSink, SceneTarget};

/// State shared by the browser page and the native window. Holds the scene,
/// the color controller wired to it, the camera and the debug panel.
pub struct Viewer {
    model: SceneModel,
    controller: ColorController,
    camera: OrbitCamera,
    panel: DebugPanel,
}

impl Viewer {
    /// Binds the scene and pushes `color` into it once.
    pub fn new(scene: &Scene, color: Hsla) -> Result<Self, SceneError> {
        let bindings = SceneBindings::resolve(scene)?;
        let model = SceneModel::from_scene(scene);
        let controller = scene_controller(&model, &bindings, color);
        controller.propagate();
        let panel = DebugPanel::new(RenderParams::default(), controller.hex_string());
        info!("Bound {}", bindings.describe(scene));
        Ok(Self {
            model,
            controller,
            camera: OrbitCamera::default(),
            panel,
        })
    }

    pub fn model(&self) -> &SceneModel {
        &self.model
    }

    pub fn controller(&self) -> &ColorController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ColorController {
        &mut self.controller
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn panel(&self) -> &DebugPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut DebugPanel {
        &mut self.panel
    }

    /// Routes a debug color-picker change to the scene only.
    pub fn pick_scene_color(&mut self, style: &str) {
        let style = self.panel.pick_color(style).to_string();
        self.controller.preview_scene(&style);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize(width, height);
    }

    /// Advances the camera by `dt` seconds and snapshots the scene.
    pub fn frame(&mut self, dt: f32) -> FrameState {
        self.camera.update(dt);
        let objects = self.model.all_objects();
        FrameState {
            camera: self.camera.params(),
            background: self.model.background(),
            lights: lights_from_objects(&objects),
            params: self.panel.params(),
            objects,
        }
    }
}

/// Builds a controller recoloring the background, both lights and the
/// emissive mesh of `model`.
/// Runs `f` on the state behind a weak UI-callback handle. Returns `None`
/// once the owner has been dropped, so stale callbacks become no-ops.
pub fn with_live<T, R>(handle: &Weak<RefCell<T>>, f: impl FnOnce(&mut T) -> R) -> Option<R> {
    let state = handle.upgrade()?;
    let result = f(&mut state.borrow_mut());
    Some(result)
}

pub fn scene_controller(model: &SceneModel, bindings: &SceneBindings, color: Hsla) -> ColorController {
    let mut controller = ColorController::new(color);
    let targets = [
        SceneTarget::Emissive(bindings.emissive_mesh),
        SceneTarget::LightColor(bindings.key_light),
        SceneTarget::LightColor(bindings.fill_light),
        SceneTarget::Background,
    ];
    for target in targets {
        controller.register(SinkScope::Scene, SceneSink::new(model.clone(), target));
    }
    controller
}

pub fn lights_from_objects(objects: &[SceneObject]) -> Vec<LightParams> {
    objects
        .iter()
        .filter(|object| object.is_light())
        .map(|light| LightParams {
            position: light.position,
            color: light.color,
            intensity: light.intensity.max(0.0),
        })
        .collect()
}

pub fn scene_summary(scene: &Scene) -> Vec<String> {
    let mut lines = vec![format!(
        "Loaded scene with {} objects ({} lights)",
        scene.objects.len(),
        scene.lights().count()
    )];
    lines.extend(
        scene
            .objects
            .iter()
            .map(|object| format!(" - {} ({})", object.name, object.object_type)),
    );
    lines
}

pub fn color_summary(controller: &ColorController) -> Vec<String> {
    vec![
        format!("Hue: #{}", controller.hue()),
        format!("HSL: {}", controller.hsl_string()),
        format!("Hex: {}", controller.hex_string()),
    ]
}

pub fn final_state(model: &SceneModel) -> Vec<String> {
    let mut lines = vec![
        "Final scene colors:".to_string(),
        format!(" - background {}", rgb_to_hex(model.background())),
    ];
    for object in model.all_objects() {
        let mut line = format!(" - {} color={}", object.name, rgb_to_hex(object.color));
        if let Some(emissive) = object.emissive {
            line.push_str(&format!(" emissive={}", rgb_to_hex(emissive)));
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::DEFAULT_SCENE_XML;

    fn viewer(hue: f64) -> Viewer {
        let scene = Scene::from_xml(DEFAULT_SCENE_XML).unwrap();
        Viewer::new(&scene, Hsla::new(hue, 100.0, 50.0, 1.0)).unwrap()
    }

    #[test]
    fn initial_color_reaches_the_scene() {
        let viewer = viewer(0.0);
        let model = viewer.model();
        assert_eq!(rgb_to_hex(model.background()), "#ff0000");
        assert_eq!(rgb_to_hex(model.get("PointLight2").unwrap().color), "#ff0000");
        let mesh = model.get("Monocromatica").unwrap();
        assert_eq!(mesh.emissive.map(rgb_to_hex).as_deref(), Some("#ff0000"));
        assert_eq!(viewer.panel().picker_color(), "#ff0000");
    }

    #[test]
    fn hue_changes_recolor_every_scene_target() {
        let mut viewer = viewer(0.0);
        viewer.controller_mut().set_hue(480.0);
        let lines = final_state(viewer.model());
        assert!(lines.contains(&" - background #00ff00".to_string()));
        assert!(lines.contains(&" - PointLight color=#00ff00".to_string()));
        assert!(lines
            .iter()
            .any(|line| line.ends_with("emissive=#00ff00")));
    }

    #[test]
    fn both_lights_recolor_even_when_names_repeat() {
        let xml = r#"
        <scene>
            <object><name>Lamp</name><type>light</type></object>
            <object><name>Lamp</name><type>light</type></object>
            <object><name>Ring</name><emissive>#ffffff</emissive></object>
        </scene>"#;
        let scene = Scene::from_xml(xml).unwrap();
        let viewer = Viewer::new(&scene, Hsla::new(120.0, 100.0, 50.0, 1.0)).unwrap();
        let colors: Vec<String> = lights_from_objects(&viewer.model().all_objects())
            .iter()
            .map(|light| rgb_to_hex(light.color))
            .collect();
        assert_eq!(colors, vec!["#00ff00", "#00ff00"]);
    }

    #[test]
    fn color_picker_previews_without_changing_hue() {
        let mut viewer = viewer(240.0);
        viewer.pick_scene_color("#123456");
        assert_eq!(rgb_to_hex(viewer.model().background()), "#123456");
        assert_eq!(viewer.controller().hue(), 240.0);
        assert_eq!(viewer.panel().picker_color(), "#123456");
    }

    #[test]
    fn frames_carry_both_lights_and_panel_params() {
        let mut viewer = viewer(0.0);
        viewer.panel_mut().set("bloomStrength", 1.5).unwrap();
        let frame = viewer.frame(1.0 / 60.0);
        assert_eq!(frame.lights.len(), 2);
        assert_eq!(frame.params.bloom_strength, 1.5);
        assert_eq!(frame.meshes().count(), 1);
    }

    #[test]
    fn callbacks_holding_weak_handles_do_not_keep_the_viewer_alive() {
        let owner = std::rc::Rc::new(RefCell::new(viewer(0.0)));
        let callbacks: Vec<Weak<RefCell<Viewer>>> =
            (0..8).map(|_| std::rc::Rc::downgrade(&owner)).collect();

        let hue = with_live(&callbacks[0], |viewer| {
            viewer.controller_mut().set_hue(90.0);
            viewer.controller().hue()
        });
        assert_eq!(hue, Some(90.0));
        assert_eq!(std::rc::Rc::strong_count(&owner), 1);

        drop(owner);
        for callback in &callbacks {
            assert!(with_live(callback, |viewer| viewer.controller_mut().set_hue(0.0)).is_none());
        }
    }

    #[test]
    fn summaries_describe_scene_and_color() {
        let scene = Scene::from_xml(DEFAULT_SCENE_XML).unwrap();
        let lines = scene_summary(&scene);
        assert_eq!(lines[0], "Loaded scene with 3 objects (2 lights)");
        let viewer = Viewer::new(&scene, Hsla::new(200.0, 32.0, 25.0, 1.0)).unwrap();
        assert_eq!(
            color_summary(viewer.controller()),
            vec![
                "Hue: #200".to_string(),
                "HSL: hsla(200, 32%, 25%, 1)".to_string(),
                "Hex: #2b4754".to_string(),
            ]
        );
    }
}
