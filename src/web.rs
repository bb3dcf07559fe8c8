#![cfg(target_arch = "wasm32")]

use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use glam::DVec2;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    window, Document, Element, Event, EventTarget, HtmlCanvasElement, HtmlElement,
    HtmlInputElement, MouseEvent, Node, TouchEvent,
};

use crate::app::with_live;
use crate::color::{ColorError, Hsla};
use crate::controller::{ColorSink, SinkScope};
use crate::input::{HueDial, PointerEvent, PointerTarget, RawPointer};
use crate::render::Renderer;
use crate::{Mesh, Scene, Viewer};

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Browser handle to the viewer. Dropping it (`free()` from JS) detaches
/// every DOM listener and cancels the pending animation frame; callbacks
/// only hold weak references to the state.
#[wasm_bindgen]
pub struct WasmApp {
    listeners: Vec<Listener>,
    animation: RefCell<Option<AnimationLoop>>,
    inner: Rc<RefCell<AppState>>,
}

#[wasm_bindgen]
impl WasmApp {
    /// Binds the page. `scene_xml` and `mesh_obj` fall back to the bundled
    /// scene and a torus.
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas_id: String,
        scene_xml: Option<String>,
        mesh_obj: Option<String>,
    ) -> Result<WasmApp, JsValue> {
        let scene = match scene_xml.as_deref() {
            Some(xml) => Scene::from_xml(xml),
            None => Scene::from_xml(crate::scene::DEFAULT_SCENE_XML),
        }
        .map_err(js_error)?;
        for line in crate::app::scene_summary(&scene) {
            log::info!("{line}");
        }
        let mesh = match mesh_obj.as_deref() {
            Some(obj) => Mesh::from_obj(obj).map_err(js_error)?,
            None => Mesh::torus(1.0, 0.35, 48, 16),
        };

        let state = AppState::new(&canvas_id, &scene, mesh).map_err(js_error)?;
        let inner = Rc::new(RefCell::new(state));
        let listeners = attach_listeners(&inner).map_err(js_error)?;
        Ok(Self {
            listeners,
            animation: RefCell::new(None),
            inner,
        })
    }

    /// Starts the `requestAnimationFrame` loop. Calling it again restarts
    /// the loop instead of stacking a second one.
    pub fn start(&self) -> Result<(), JsValue> {
        let animation = AnimationLoop::start(&self.inner).map_err(js_error)?;
        *self.animation.borrow_mut() = Some(animation);
        Ok(())
    }


    pub fn set_hue(&self, hue: f64) {
        self.inner.borrow_mut().set_hue(hue);
    }

    pub fn set_saturation(&self, value: f64) {
        self.inner
            .borrow_mut()
            .viewer
            .controller_mut()
            .set_saturation(value);
    }

    pub fn set_lightness(&self, value: f64) {
        self.inner
            .borrow_mut()
            .viewer
            .controller_mut()
            .set_lightness(value);
    }

    pub fn hsl_string(&self) -> String {
        self.inner.borrow().viewer.controller().hsl_string()
    }

    pub fn hex_string(&self) -> String {
        self.inner.borrow().viewer.controller().hex_string()
    }

    /// Debug panel slider; returns the clamped value actually stored.
    pub fn set_param(&self, name: &str, value: f32) -> Result<f32, JsValue> {
        self.inner
            .borrow_mut()
            .viewer
            .panel_mut()
            .set(name, value)
            .map_err(js_error)
    }

    /// Debug panel color picker: recolors the scene, not the page.
    pub fn pick_color(&self, style: &str) {
        self.inner.borrow_mut().viewer.pick_scene_color(style);
    }

    pub fn toggle_panel(&self) -> bool {
        let mut state = self.inner.borrow_mut();
        let panel = state.viewer.panel_mut();
        let visible = panel.toggle();
        if visible {
            for line in panel.describe() {
                log::info!("{line}");
            }
        }
        visible
    }
}

fn js_error(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Element handles looked up once at startup.
struct PageElements {
    document: Document,
    canvas: HtmlCanvasElement,
    dial: HtmlElement,
    handle: HtmlElement,
    hue_label: Option<Element>,
    hue_input: Option<HtmlInputElement>,
}

impl PageElements {
    fn show_hue(&self, hue: f64) {
        if let Some(label) = &self.hue_label {
            label.set_text_content(Some(&format!("#{hue}")));
        }
        if let Err(err) = self
            .handle
            .style()
            .set_property("transform", &format!("rotate({hue}deg)"))
        {
            log::warn!("failed to rotate hue handle: {err:?}");
        }
        if let Some(input) = &self.hue_input {
            input.set_value(&hue.to_string());
        }
    }

    fn dial_center(&self) -> DVec2 {
        let rect = self.dial.get_bounding_client_rect();
        DVec2::new(
            rect.left() + rect.width() / 2.0,
            rect.top() + rect.height() / 2.0,
        )
    }

    fn is_handle(&self, event: &Event) -> bool {
        let target = event.target().and_then(|t| t.dyn_into::<Node>().ok());
        self.handle.contains(target.as_ref())
    }
}

/// Sets one CSS property of an element.
struct StyleSink {
    element: HtmlElement,
    property: &'static str,
    label: String,
}

impl ColorSink for StyleSink {
    fn apply(&self, style: &str) -> Result<(), ColorError> {
        self.element
            .style()
            .set_property(self.property, style)
            .map_err(|_| ColorError::Unsupported(style.to_string()))
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Shows the color string as text.
struct TextSink {
    element: Element,
}

impl ColorSink for TextSink {
    fn apply(&self, style: &str) -> Result<(), ColorError> {
        self.element.set_text_content(Some(style));
        Ok(())
    }

    fn label(&self) -> &str {
        "HSL label"
    }
}

struct AppState {
    viewer: Viewer,
    renderer: Renderer,
    dial: HueDial,
    page: PageElements,
    last_timestamp: Option<f64>,
}

impl AppState {
    fn new(canvas_id: &str, scene: &Scene, mesh: Mesh) -> Result<Self> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| anyhow!("document not available"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| anyhow!("canvas element #{canvas_id} not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| anyhow!("element #{canvas_id} is not a canvas"))?;

        let nav_menu = html_element(&document, "#navMenu")?;
        let swatch = html_element(&document, ".monocromaticaHue")?;
        let page = PageElements {
            dial: html_element(&document, ".hue")?,
            handle: html_element(&document, ".hue-slider-handle")?,
            hue_label: swatch.first_element_child(),
            hue_input: optional_element(&document, "input[name=hue]")
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok()),
            document: document.clone(),
            canvas: canvas.clone(),
        };

        let (width, height) = viewport_size()?;
        let mut renderer = Renderer::new(canvas, mesh)?;
        renderer.resize((width, height));

        let mut viewer = Viewer::new(scene, Hsla::random_hue()).context("scene cannot be recolored")?;
        viewer.resize(width, height);

        let controller = viewer.controller_mut();
        controller.register(
            SinkScope::Page,
            StyleSink {
                element: nav_menu,
                property: "background-color",
                label: "#navMenu background".to_string(),
            },
        );
        controller.register(
            SinkScope::Page,
            StyleSink {
                element: swatch,
                property: "background-color",
                label: ".monocromaticaHue background".to_string(),
            },
        );
        if let Some(element) = optional_element(&document, "#hslLabel") {
            controller.register(SinkScope::Page, TextSink { element });
        }
        controller.propagate();

        let dial = HueDial::new(page.dial_center());
        page.show_hue(viewer.controller().hue());

        Ok(Self {
            viewer,
            renderer,
            dial,
            page,
            last_timestamp: None,
        })
    }

    fn set_hue(&mut self, hue: f64) {
        self.viewer.controller_mut().set_hue(hue);
        self.page.show_hue(self.viewer.controller().hue());
    }

    fn pointer(&mut self, event: PointerEvent) {
        if matches!(event, PointerEvent::Down) {
            self.dial.set_pivot(self.page.dial_center());
        }
        if self.dial.drive(&event, self.viewer.controller_mut()) {
            self.page.show_hue(self.viewer.controller().hue());
        }
    }

    fn resize(&mut self) -> Result<()> {
        let (width, height) = viewport_size()?;
        self.renderer.resize((width, height));
        self.viewer.resize(width, height);
        self.dial.set_pivot(self.page.dial_center());
        Ok(())
    }

    fn render_frame(&mut self, timestamp: f64) -> Result<()> {
        let dt = self
            .last_timestamp
            .map(|last| ((timestamp - last) / 1000.0).clamp(0.0, 0.1) as f32)
            .unwrap_or(0.0);
        self.last_timestamp = Some(timestamp);
        let frame = self.viewer.frame(dt);
        self.renderer.render(&frame).map_err(|err| {
            let message = err
                .as_string()
                .unwrap_or_else(|| "unknown canvas error".to_string());
            anyhow!("render failed: {message}")
        })
    }
}

fn html_element(document: &Document, selector: &str) -> Result<HtmlElement> {
    optional_element(document, selector)
        .ok_or_else(|| anyhow!("page has no {selector} element"))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| anyhow!("{selector} is not an HTML element"))
}

fn optional_element(document: &Document, selector: &str) -> Option<Element> {
    document.query_selector(selector).ok().flatten()
}

fn viewport_size() -> Result<(u32, u32)> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let dimension = |value: Result<JsValue, JsValue>| {
        value
            .ok()
            .and_then(|v| v.as_f64())
            .map(|v| v.max(1.0) as u32)
            .unwrap_or(1)
    };
    Ok((
        dimension(window.inner_width()),
        dimension(window.inner_height()),
    ))
}

/// Mouse and touch events reduced to the pointer data the dial consumes.
fn raw_pointer(event: &Event) -> Option<RawPointer> {
    if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
        return Some(RawPointer::Mouse {
            x: f64::from(mouse.client_x()),
            y: f64::from(mouse.client_y()),
        });
    }
    let touches = event.dyn_ref::<TouchEvent>()?.touches();
    let points = (0..touches.length())
        .filter_map(|i| touches.get(i))
        .map(|touch| DVec2::new(f64::from(touch.client_x()), f64::from(touch.client_y())))
        .collect();
    Some(RawPointer::Touch(points))
}

/// Event listener removed from its target on drop.
struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn new(
        target: &EventTarget,
        event: &'static str,
        callback: impl FnMut(Event) + 'static,
    ) -> Result<Self> {
        let callback = Closure::wrap(Box::new(callback) as Box<dyn FnMut(Event)>);
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("failed to listen for {event}: {err:?}"))?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

fn attach_listeners(app: &Rc<RefCell<AppState>>) -> Result<Vec<Listener>> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let (document, handle, hue_input) = {
        let state = app.borrow();
        (
            state.page.document.clone(),
            state.page.handle.clone(),
            state.page.hue_input.clone(),
        )
    };
    let mut listeners = Vec::new();

    for name in ["mousedown", "touchstart"] {
        let state = Rc::downgrade(app);
        listeners.push(Listener::new(&handle, name, move |_| {
            with_live(&state, |state| state.pointer(PointerEvent::Down));
        })?);
    }

    for name in ["mouseup", "touchend", "touchcancel"] {
        let state = Rc::downgrade(app);
        listeners.push(Listener::new(&document, name, move |_| {
            with_live(&state, |state| state.pointer(PointerEvent::Up));
        })?);
    }

    for name in ["mousemove", "touchmove"] {
        let state = Rc::downgrade(app);
        listeners.push(Listener::new(&document, name, move |event| {
            let Some(pointer) = raw_pointer(&event) else {
                return;
            };
            with_live(&state, |state| {
                let target = if state.page.is_handle(&event) {
                    PointerTarget::Handle
                } else {
                    PointerTarget::Other
                };
                state.pointer(PointerEvent::Move { target, pointer });
            });
        })?);
    }

    if let Some(input) = hue_input {
        let state = Rc::downgrade(app);
        let field = input.clone();
        listeners.push(Listener::new(&input, "input", move |_| {
            match field.value().trim().parse::<f64>() {
                Ok(hue) => {
                    with_live(&state, |state| state.set_hue(hue));
                }
                Err(_) => log::debug!("ignoring hue input {:?}", field.value()),
            }
        })?);
    }

    {
        let state = Rc::downgrade(app);
        listeners.push(Listener::new(&window, "resize", move |_| {
            with_live(&state, |state| {
                if let Err(err) = state.resize() {
                    log::error!("resize failed: {err:?}");
                }
            });
        })?);
    }

    Ok(listeners)
}

type FrameCallback = Closure<dyn FnMut(f64)>;

/// Self-rescheduling `requestAnimationFrame` loop. The callback reaches the
/// state and itself through weak references, so dropping the loop frees
/// the closure and cancels the frame still queued.
struct AnimationLoop {
    callback: Rc<RefCell<Option<FrameCallback>>>,
    pending: Rc<Cell<Option<i32>>>,
}

impl AnimationLoop {
    fn start(app: &Rc<RefCell<AppState>>) -> Result<Self> {
        let callback: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
        let pending = Rc::new(Cell::new(None));

        let state = Rc::downgrade(app);
        let next = Rc::downgrade(&callback);
        let queued = Rc::clone(&pending);
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
            queued.set(None);
            let rendered = with_live(&state, |state| {
                if let Err(err) = state.render_frame(timestamp) {
                    log::error!("{err:?}");
                }
            });
            if rendered.is_none() {
                return;
            }
            if let Some(next) = next.upgrade() {
                match next.borrow().as_ref().map(request_frame) {
                    Some(Ok(id)) => queued.set(Some(id)),
                    Some(Err(err)) => log::error!("{err:?}"),
                    None => {}
                }
            }
        }) as Box<dyn FnMut(f64)>));

        let id = callback
            .borrow()
            .as_ref()
            .map(request_frame)
            .ok_or_else(|| anyhow!("animation callback missing"))??;
        pending.set(Some(id));
        Ok(Self { callback, pending })
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        if let (Some(id), Some(window)) = (self.pending.take(), window()) {
            let _ = window.cancel_animation_frame(id);
        }
        self.callback.borrow_mut().take();
    }
}

fn request_frame(callback: &FrameCallback) -> Result<i32> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    window
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))
}
