use glam::{Mat4, Vec3};

use crate::params::RenderParams;
use crate::scene::SceneObject;

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// Point light state consumed by the renderer's uniform buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct LightParams {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

/// Everything a renderer needs to draw one frame.
#[derive(Clone, Debug)]
pub struct FrameState {
    pub camera: CameraParams,
    pub background: Vec3,
    pub lights: Vec<LightParams>,
    pub params: RenderParams,
    pub objects: Vec<SceneObject>,
}

impl FrameState {
    pub fn meshes(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|object| object.is_mesh())
    }
}

pub fn object_model_matrix(object: &SceneObject) -> Mat4 {
    let translation = Mat4::from_translation(object.position);
    let rotation = Mat4::from_rotation_z(object.rotation.z.to_radians())
        * Mat4::from_rotation_y(object.rotation.y.to_radians())
        * Mat4::from_rotation_x(object.rotation.x.to_radians());
    translation * rotation * Mat4::from_scale(object.scale)
}

/// Decodes sRGB channels (as parsed from CSS strings) to linear light.
pub fn srgb_to_linear(color: Vec3) -> Vec3 {
    let decode = |c: f32| {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(decode(color.x), decode(color.y), decode(color.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_endpoints_are_preserved() {
        assert_eq!(srgb_to_linear(Vec3::ZERO), Vec3::ZERO);
        assert!((srgb_to_linear(Vec3::ONE) - Vec3::ONE).length() < 1e-6);
        let mid = srgb_to_linear(Vec3::splat(0.5));
        assert!((mid.x - 0.214).abs() < 1e-3);
    }

    #[test]
    fn model_matrix_applies_scale_then_translation() {
        let object = SceneObject {
            position: Vec3::new(1.0, 0.0, 0.0),
            scale: Vec3::splat(2.0),
            ..SceneObject::default()
        };
        let moved = object_model_matrix(&object).transform_point3(Vec3::X);
        assert!((moved - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-6);
    }
}
