use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;

use crate::scene::{Scene, SceneObject};

#[derive(Debug, Default)]
struct SceneState {
    background: Vec3,
    objects: Vec<SceneObject>,
}

/// Shared, mutable view of the loaded scene. Sinks write colors into it and
/// renderers read a snapshot every frame.
#[derive(Debug, Default)]
pub struct SceneModel {
    state: Arc<RwLock<SceneState>>,
}

impl Clone for SceneModel {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl SceneModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scene(scene: &Scene) -> Self {
        Self {
            state: Arc::new(RwLock::new(SceneState {
                background: scene.background,
                objects: scene.objects.clone(),
            })),
        }
    }

    /// Returns a snapshot of all stored objects.
    pub fn all_objects(&self) -> Vec<SceneObject> {
        self.state.read().objects.clone()
    }

    pub fn background(&self) -> Vec3 {
        self.state.read().background
    }

    pub fn set_background(&self, color: Vec3) {
        self.state.write().background = color;
    }

    /// Returns a clone of the requested object.
    pub fn get(&self, name: &str) -> Option<SceneObject> {
        self.state
            .read()
            .objects
            .iter()
            .find(|object| object.name == name)
            .cloned()
    }

    /// Returns a clone of the object at `index`.
    pub fn object(&self, index: usize) -> Option<SceneObject> {
        self.state.read().objects.get(index).cloned()
    }

    /// Applies a mutation to the object at `index`.
    pub fn update<F, R>(&self, index: usize, updater: F) -> Option<R>
    where
        F: FnOnce(&mut SceneObject) -> R,
    {
        let mut guard = self.state.write();
        guard.objects.get_mut(index).map(updater)
    }

    pub fn set_color(&self, index: usize, color: Vec3) -> bool {
        self.update(index, |obj| obj.color = color).is_some()
    }

    pub fn set_emissive(&self, index: usize, color: Vec3) -> bool {
        self.update(index, |obj| obj.emissive = Some(color)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene {
            background: Vec3::ZERO,
            objects: vec![SceneObject {
                name: "Lamp".to_string(),
                object_type: "light".to_string(),
                ..SceneObject::default()
            }],
        }
    }

    #[test]
    fn clones_share_state() {
        let model = SceneModel::from_scene(&scene());
        let other = model.clone();
        assert!(other.set_color(0, Vec3::X));
        assert_eq!(model.get("Lamp").unwrap().color, Vec3::X);
        other.set_background(Vec3::Y);
        assert_eq!(model.background(), Vec3::Y);
    }

    #[test]
    fn update_returns_false_for_out_of_range_index() {
        let model = SceneModel::new();
        assert!(!model.set_color(0, Vec3::ONE));
        assert!(!model.set_emissive(3, Vec3::ONE));
    }

    #[test]
    fn same_named_objects_are_updated_independently() {
        let mut scene = scene();
        scene.objects.push(scene.objects[0].clone());
        let model = SceneModel::from_scene(&scene);
        assert!(model.set_color(1, Vec3::Z));
        assert_eq!(model.object(0).unwrap().color, SceneObject::default().color);
        assert_eq!(model.object(1).unwrap().color, Vec3::Z);
    }
}
