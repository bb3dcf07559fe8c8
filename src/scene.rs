use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{parse_color_style, ColorError};

/// Scene shipped with the crate, used when no scene file is given.
pub const DEFAULT_SCENE_XML: &str = include_str!("../assets/scene.xml");

const DEFAULT_EMISSIVE_INTENSITY: f32 = 10.0;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("invalid scene XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("<{0}> tag is missing")]
    MissingTag(&'static str),
    #[error("invalid <{tag}> value `{value}`")]
    InvalidValue { tag: &'static str, value: String },
    #[error("invalid <{tag}> color: {source}")]
    InvalidColor {
        tag: &'static str,
        #[source]
        source: ColorError,
    },
    #[error("scene has no {0}")]
    MissingNode(&'static str),
}

/// Runtime representation of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default = "default_background")]
    pub background: Vec3,
    pub objects: Vec<SceneObject>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            background: default_background(),
            objects: Vec::new(),
        }
    }
}

impl Scene {
    /// Parses a scene description. Colors are CSS color strings.
    pub fn from_xml(xml: &str) -> Result<Self, SceneError> {
        let document = Document::parse(xml)?;
        let root = document.root_element();
        let background = match optional_text(&root, "background") {
            Some(value) => parse_color("background", &value)?,
            None => default_background(),
        };

        let mut objects = Vec::new();
        for node in root.children().filter(|n| n.has_tag_name("object")) {
            objects.push(parse_object(&node)?);
        }

        Ok(Self {
            background,
            objects,
        })
    }

    pub fn lights(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|object| object.is_light())
    }
}

fn parse_object(node: &Node<'_, '_>) -> Result<SceneObject, SceneError> {
    let mut object = SceneObject {
        name: optional_text(node, "name").ok_or(SceneError::MissingTag("name"))?,
        ..SceneObject::default()
    };
    if let Some(object_type) = optional_text(node, "type") {
        object.object_type = object_type;
    }
    object.mesh = optional_text(node, "mesh");
    if let Some(color) = optional_text(node, "color") {
        object.color = parse_color("color", &color)?;
    }
    if let Some(emissive) = optional_text(node, "emissive") {
        object.emissive = Some(parse_color("emissive", &emissive)?);
    }
    if let Some(value) = optional_text(node, "emissiveIntensity") {
        object.emissive_intensity = parse_f32("emissiveIntensity", &value)?;
    }
    if let Some(value) = optional_text(node, "position") {
        object.position = parse_vec3("position", &value)?;
    }
    if let Some(value) = optional_text(node, "rotation") {
        object.rotation = parse_vec3("rotation", &value)?;
    }
    if let Some(value) = optional_text(node, "scale") {
        object.scale = parse_vec3("scale", &value)?;
    }
    if let Some(value) = optional_text(node, "intensity") {
        object.intensity = parse_f32("intensity", &value)?;
    }
    Ok(object)
}

/// Scene object as described in the scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive: Option<Vec3>,
    #[serde(default = "default_emissive_intensity")]
    pub emissive_intensity: f32,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            object_type: "mesh".to_string(),
            mesh: None,
            color: default_color(),
            emissive: None,
            emissive_intensity: default_emissive_intensity(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
            intensity: default_intensity(),
        }
    }
}

impl SceneObject {
    pub fn is_light(&self) -> bool {
        self.object_type == "light"
    }

    pub fn is_mesh(&self) -> bool {
        self.object_type == "mesh"
    }
}

fn default_background() -> Vec3 {
    Vec3::splat(17.0 / 255.0)
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_intensity() -> f32 {
    1.0
}

fn default_emissive_intensity() -> f32 {
    DEFAULT_EMISSIVE_INTENSITY
}

/// Positions in [`Scene::objects`] of the three nodes the color pipeline
/// drives. Object names need not be unique, so nodes are bound by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneBindings {
    pub key_light: usize,
    pub fill_light: usize,
    pub emissive_mesh: usize,
}

impl SceneBindings {
    /// Finds the first two lights and the first emissive mesh. A scene
    /// without them cannot be recolored, so this fails at startup.
    pub fn resolve(scene: &Scene) -> Result<Self, SceneError> {
        let mut lights = scene
            .objects
            .iter()
            .enumerate()
            .filter(|(_, object)| object.is_light())
            .map(|(index, _)| index);
        let key_light = lights.next().ok_or(SceneError::MissingNode("point light"))?;
        let fill_light = lights
            .next()
            .ok_or(SceneError::MissingNode("second point light"))?;
        let emissive_mesh = scene
            .objects
            .iter()
            .position(|object| object.is_mesh() && object.emissive.is_some())
            .ok_or(SceneError::MissingNode("emissive mesh"))?;
        Ok(Self {
            key_light,
            fill_light,
            emissive_mesh,
        })
    }

    /// Human-readable names of the bound nodes, for logging.
    pub fn describe(&self, scene: &Scene) -> String {
        let name = |index: usize| {
            scene
                .objects
                .get(index)
                .map_or("<missing>", |object| object.name.as_str())
        };
        format!(
            "lights {} and {}, emissive mesh {}",
            name(self.key_light),
            name(self.fill_light),
            name(self.emissive_mesh)
        )
    }
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_color(tag: &'static str, value: &str) -> Result<Vec3, SceneError> {
    parse_color_style(value).map_err(|source| SceneError::InvalidColor { tag, source })
}

fn parse_vec3(tag: &'static str, value: &str) -> Result<Vec3, SceneError> {
    let invalid = || SceneError::InvalidValue {
        tag,
        value: value.to_string(),
    };
    let components = value
        .split_whitespace()
        .map(|component| component.parse::<f32>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    match components.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(invalid()),
    }
}

fn parse_f32(tag: &'static str, value: &str) -> Result<f32, SceneError> {
    value.parse::<f32>().map_err(|_| SceneError::InvalidValue {
        tag,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scene_binds_all_nodes() {
        let scene = Scene::from_xml(DEFAULT_SCENE_XML).unwrap();
        assert_eq!(scene.objects.len(), 3);
        assert_eq!(scene.background, Vec3::splat(17.0 / 255.0));
        let bindings = SceneBindings::resolve(&scene).unwrap();
        assert_eq!(scene.objects[bindings.key_light].name, "PointLight");
        assert_eq!(scene.objects[bindings.fill_light].name, "PointLight2");
        assert_eq!(scene.objects[bindings.emissive_mesh].name, "Monocromatica");
        assert_eq!(
            bindings.describe(&scene),
            "lights PointLight and PointLight2, emissive mesh Monocromatica"
        );
        let mesh = scene.objects.iter().find(|o| o.name == "Monocromatica").unwrap();
        assert_eq!(mesh.emissive_intensity, 10.0);
    }

    #[test]
    fn parses_object_fields() {
        let xml = r#"
        <scene>
            <object>
                <name>Lamp</name>
                <type>light</type>
                <position>0 5 0</position>
                <color>#ff8000</color>
                <intensity>2.5</intensity>
            </object>
        </scene>"#;
        let scene = Scene::from_xml(xml).unwrap();
        let lamp = &scene.objects[0];
        assert!(lamp.is_light());
        assert_eq!(lamp.position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(lamp.color, Vec3::new(1.0, 128.0 / 255.0, 0.0));
        assert!((lamp.intensity - 2.5).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><object><type>mesh</type></object></scene>";
        assert!(matches!(
            Scene::from_xml(bad),
            Err(SceneError::MissingTag("name"))
        ));
    }

    #[test]
    fn bad_color_is_reported_with_its_tag() {
        let bad = "<scene><background>chartreuse-ish</background></scene>";
        assert!(matches!(
            Scene::from_xml(bad),
            Err(SceneError::InvalidColor {
                tag: "background",
                ..
            })
        ));
    }

    #[test]
    fn scene_without_emissive_mesh_cannot_be_bound() {
        let xml = r#"
        <scene>
            <object><name>A</name><type>light</type></object>
            <object><name>B</name><type>light</type></object>
            <object><name>Model</name></object>
        </scene>"#;
        let scene = Scene::from_xml(xml).unwrap();
        assert!(matches!(
            SceneBindings::resolve(&scene),
            Err(SceneError::MissingNode("emissive mesh"))
        ));
    }

    #[test]
    fn lights_sharing_a_name_bind_to_distinct_nodes() {
        let xml = r#"
        <scene>
            <object><name>Lamp</name><type>light</type></object>
            <object><name>Lamp</name><type>light</type></object>
            <object><name>Ring</name><emissive>#ffffff</emissive></object>
        </scene>"#;
        let scene = Scene::from_xml(xml).unwrap();
        let bindings = SceneBindings::resolve(&scene).unwrap();
        assert_eq!((bindings.key_light, bindings.fill_light), (0, 1));
        assert_eq!(bindings.emissive_mesh, 2);
    }

    #[test]
    fn scene_with_one_light_cannot_be_bound() {
        let xml = "<scene><object><name>A</name><type>light</type></object></scene>";
        let scene = Scene::from_xml(xml).unwrap();
        assert!(matches!(
            SceneBindings::resolve(&scene),
            Err(SceneError::MissingNode("second point light"))
        ));
    }
}
