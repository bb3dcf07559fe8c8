use anyhow::{anyhow, Result};
use glam::{Mat4, Vec2, Vec3};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::color::rgb_to_hex;
use crate::mesh::Mesh;

use super::common::{object_model_matrix, FrameState};

// Canvas 2D has no depth buffer; drawing every triangle of a dense mesh
// only muddies the outline.
const MAX_TRIANGLES: usize = 1200;

/// Wireframe renderer backed by a 2D canvas for WebAssembly builds. Bloom is
/// approximated with canvas shadows.
pub struct Renderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    mesh: Mesh,
    size: (u32, u32),
}

impl Renderer {
    /// Creates a renderer that draws into the provided HTML canvas element.
    pub fn new(canvas: HtmlCanvasElement, mesh: Mesh) -> Result<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|err| anyhow!("failed to query canvas context: {err:?}"))?
            .ok_or_else(|| anyhow!("canvas does not support 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("failed to cast canvas context"))?;

        let size = (canvas.width(), canvas.height());
        Ok(Self {
            canvas,
            context,
            mesh,
            size,
        })
    }

    /// Updates the canvas dimensions to match the browser layout.
    pub fn resize(&mut self, new_size: (u32, u32)) {
        if new_size.0 == 0 || new_size.1 == 0 {
            return;
        }
        self.size = new_size;
        self.canvas.set_width(new_size.0);
        self.canvas.set_height(new_size.1);
    }

    pub fn render(&mut self, frame: &FrameState) -> Result<(), JsValue> {
        let (width, height) = (f64::from(self.size.0), f64::from(self.size.1));
        let ctx = &self.context;

        ctx.set_shadow_blur(0.0);
        ctx.set_fill_style(&rgb_to_hex(frame.background).into());
        ctx.fill_rect(0.0, 0.0, width, height);

        let view_proj = frame.camera.view_proj;
        let params = frame.params;
        let exposure = (params.tone_mapping_exposure() / 16.0).clamp(0.05, 1.0);
        let glow = 4.0 + 60.0 * f64::from(params.bloom_radius) * f64::from(params.bloom_strength) / 6.0;

        for object in frame.meshes() {
            let emissive = object.emissive.unwrap_or(object.color);
            let emissive_css = rgb_to_hex(emissive);
            let clip = view_proj * object_model_matrix(object);
            let points: Vec<Option<Vec2>> = (0..self.mesh.vertex_count())
                .map(|i| project(clip, self.mesh.position(i), self.size))
                .collect();

            ctx.set_global_alpha(f64::from(exposure));
            ctx.set_stroke_style(&emissive_css.clone().into());
            ctx.set_shadow_color(&emissive_css);
            ctx.set_shadow_blur(glow);
            ctx.set_line_width(1.0);
            ctx.begin_path();
            let stride = (self.mesh.indices.len() / 3 / MAX_TRIANGLES).max(1);
            for triangle in self.mesh.indices.chunks_exact(3).step_by(stride) {
                let corners = [0, 1, 2].map(|k| points[triangle[k] as usize]);
                let [Some(a), Some(b), Some(c)] = corners else {
                    continue;
                };
                ctx.move_to(f64::from(a.x), f64::from(a.y));
                ctx.line_to(f64::from(b.x), f64::from(b.y));
                ctx.line_to(f64::from(c.x), f64::from(c.y));
                ctx.close_path();
            }
            ctx.stroke();
        }

        ctx.set_global_alpha(1.0);
        for light in &frame.lights {
            let Some(point) = project(view_proj, light.position, self.size) else {
                continue;
            };
            let css = rgb_to_hex(light.color);
            ctx.set_fill_style(&css.clone().into());
            ctx.set_shadow_color(&css);
            ctx.set_shadow_blur(glow * 0.5);
            ctx.begin_path();
            ctx.arc(
                f64::from(point.x),
                f64::from(point.y),
                3.0 + f64::from(light.intensity),
                0.0,
                std::f64::consts::TAU,
            )?;
            ctx.fill();
        }
        ctx.set_shadow_blur(0.0);
        Ok(())
    }
}

/// Projects a point to canvas pixels; `None` when it is behind the camera.
fn project(clip_from_local: Mat4, point: Vec3, size: (u32, u32)) -> Option<Vec2> {
    let clip = clip_from_local * point.extend(1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vec2::new(
        (ndc.x * 0.5 + 0.5) * size.0 as f32,
        (0.5 - ndc.y * 0.5) * size.1 as f32,
    ))
}
