use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Mat4, Vec3};

use crate::render::CameraParams;

const FOV_DEGREES: f32 = 45.0;
const NEAR: f32 = 1.0;
const FAR: f32 = 2000.0;
// Keeps the camera off the poles where look_at degenerates.
const MAX_ELEVATION: f32 = FRAC_PI_2 - 0.01;

/// Camera circling the origin. Auto-rotates, eases out user rotation and
/// never pans.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    target: Vec3,
    azimuth: f32,
    elevation: f32,
    distance: f32,
    min_distance: f32,
    max_distance: f32,
    aspect: f32,
    /// Full turns per minute.
    pub auto_rotate_speed: f32,
    pub auto_rotate: bool,
    pub damping: f32,
    velocity: (f32, f32),
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_from(Vec3::new(10.0, 0.0, 0.0))
    }
}

impl OrbitCamera {
    pub fn looking_from(position: Vec3) -> Self {
        let distance = position.length().max(f32::EPSILON);
        let mut camera = Self {
            target: Vec3::ZERO,
            azimuth: position.x.atan2(position.z),
            elevation: (position.y / distance).clamp(-1.0, 1.0).asin(),
            distance,
            min_distance: 5.0,
            max_distance: 10.0,
            aspect: 1.0,
            auto_rotate_speed: 2.0,
            auto_rotate: true,
            damping: 0.05,
            velocity: (0.0, 0.0),
        };
        camera.distance = camera.distance.clamp(camera.min_distance, camera.max_distance);
        camera
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Updates the projection for a new viewport size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
    }

    /// Adds user rotation; it decays over the following frames.
    pub fn rotate(&mut self, azimuth: f32, elevation: f32) {
        self.velocity.0 += azimuth;
        self.velocity.1 += elevation;
    }

    pub fn zoom(&mut self, factor: f32) {
        if factor > 0.0 && factor.is_finite() {
            self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
        }
    }

    /// Advances the orbit by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if self.auto_rotate {
            self.azimuth += TAU / 60.0 * self.auto_rotate_speed * dt;
        }
        let (yaw, pitch) = self.velocity;
        self.azimuth = (self.azimuth + yaw * self.damping).rem_euclid(TAU);
        self.elevation = (self.elevation + pitch * self.damping).clamp(-MAX_ELEVATION, MAX_ELEVATION);
        let keep = 1.0 - self.damping;
        self.velocity = (yaw * keep, pitch * keep);
    }

    pub fn position(&self) -> Vec3 {
        let horizontal = self.distance * self.elevation.cos();
        self.target
            + Vec3::new(
                horizontal * self.azimuth.sin(),
                self.distance * self.elevation.sin(),
                horizontal * self.azimuth.cos(),
            )
    }

    pub fn params(&self) -> CameraParams {
        let position = self.position();
        let view = Mat4::look_at_rh(position, self.target, Vec3::Y);
        let projection =
            Mat4::perspective_rh_gl(FOV_DEGREES.to_radians(), self.aspect.max(0.01), NEAR, FAR);
        CameraParams {
            view_proj: projection * view,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_the_x_axis() {
        let camera = OrbitCamera::default();
        assert!((camera.position() - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn distance_is_clamped() {
        let mut camera = OrbitCamera::looking_from(Vec3::new(0.0, 0.0, 40.0));
        assert_eq!(camera.distance(), 10.0);
        camera.zoom(0.1);
        assert_eq!(camera.distance(), 5.0);
        camera.zoom(-1.0);
        assert_eq!(camera.distance(), 5.0);
    }

    #[test]
    fn auto_rotation_keeps_distance() {
        let mut camera = OrbitCamera::default();
        let before = camera.position();
        for _ in 0..30 {
            camera.update(1.0 / 60.0);
        }
        let after = camera.position();
        assert!((after - before).length() > 0.01);
        assert!((after.length() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn user_rotation_decays() {
        let mut camera = OrbitCamera::default();
        camera.auto_rotate = false;
        camera.rotate(1.0, 0.0);
        for _ in 0..500 {
            camera.update(1.0 / 60.0);
        }
        let settled = camera.position();
        camera.update(1.0 / 60.0);
        assert!((camera.position() - settled).length() < 1e-3);
    }

    #[test]
    fn zero_height_viewport_has_unit_aspect() {
        let mut camera = OrbitCamera::default();
        camera.resize(800, 0);
        assert_eq!(camera.aspect(), 1.0);
        camera.resize(800, 400);
        assert_eq!(camera.aspect(), 2.0);
    }
}
