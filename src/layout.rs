use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, Projection};
use crate::effects::{AirshipSpec, ConvergeSpec, RailSpec, SpinSpec, StarfieldSpec};
use crate::navigation::Destination;
use crate::transition::TransitionConfig;
use crate::viewport::Viewport;

const HOME_XML: &str = include_str!("../layouts/home.xml");
const PORTFOLIO_XML: &str = include_str!("../layouts/portfolio.xml");

/// Declarative description of a landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub name: String,
    pub camera: CameraSpec,
    #[serde(default)]
    pub transition: TransitionConfig,
    pub models: Vec<ModelSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin: Option<SpinSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converge: Option<ConvergeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rail: Option<RailSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starfield: Option<StarfieldSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProjectionSpec {
    Perspective { fov_y_degrees: f32 },
    Orthographic { half_height: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSpec {
    pub projection: ProjectionSpec,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    /// Where the camera moves once every model has loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_position: Option<Vec3>,
}

impl CameraSpec {
    pub fn build(&self, viewport: Viewport) -> Camera {
        let aspect = viewport.aspect();
        let projection = match self.projection {
            ProjectionSpec::Perspective { fov_y_degrees } => Projection::Perspective {
                fov_y_degrees,
                aspect,
                near: self.near,
                far: self.far,
            },
            ProjectionSpec::Orthographic { half_height } => Projection::Orthographic {
                half_height,
                aspect,
                near: self.near,
                far: self.far,
            },
        };
        Camera::looking_forward(self.position, projection)
    }
}

/// Pickable sphere placed relative to a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickableArea {
    pub offset: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub path: String,
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in radians.
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    pub destination: Destination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickable: Option<ClickableArea>,
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

impl PageLayout {
    /// Returns the XML of a layout shipped with the crate.
    pub fn bundled_xml(name: &str) -> Option<&'static str> {
        match name {
            "home" => Some(HOME_XML),
            "portfolio" => Some(PORTFOLIO_XML),
            _ => None,
        }
    }

    pub fn bundled(name: &str) -> Result<Self> {
        let xml = Self::bundled_xml(name).ok_or_else(|| anyhow!("no bundled layout named {name}"))?;
        Self::from_xml(xml).with_context(|| format!("bundled layout {name} is invalid"))
    }

    /// Parses a `<page>` document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid layout XML")?;
        let page = document.root_element();
        if !page.has_tag_name("page") {
            return Err(anyhow!(
                "expected <page> root element, found <{}>",
                page.tag_name().name()
            ));
        }

        let name = optional_text(&page, "name").unwrap_or_else(|| "page".to_string());
        let camera = parse_camera(&child(&page, "camera").ok_or_else(|| anyhow!("<camera> tag is missing"))?)
            .context("invalid <camera>")?;
        let transition = match child(&page, "transition") {
            Some(node) => parse_transition(&node).context("invalid <transition>")?,
            None => TransitionConfig::default(),
        };

        let models = page
            .children()
            .filter(|n| n.has_tag_name("model"))
            .enumerate()
            .map(|(index, node)| {
                parse_model(&node).with_context(|| format!("invalid <model> #{}", index + 1))
            })
            .collect::<Result<Vec<_>>>()?;

        let spin = child(&page, "spin")
            .map(|node| parse_spin(&node).context("invalid <spin>"))
            .transpose()?;
        let converge = child(&page, "converge")
            .map(|node| parse_converge(&node).context("invalid <converge>"))
            .transpose()?;
        let rail = child(&page, "rail")
            .map(|node| parse_rail(&node).context("invalid <rail>"))
            .transpose()?;
        let starfield = child(&page, "starfield")
            .map(|node| parse_starfield(&node).context("invalid <starfield>"))
            .transpose()?;

        Ok(Self {
            name,
            camera,
            transition,
            models,
            spin,
            converge,
            rail,
            starfield,
        })
    }
}

fn parse_camera(node: &Node<'_, '_>) -> Result<CameraSpec> {
    let projection = match optional_text(node, "projection").as_deref() {
        Some("orthographic") => ProjectionSpec::Orthographic {
            half_height: parse_f32(optional_text(node, "half-height"), 4.0)?,
        },
        Some("perspective") | None => ProjectionSpec::Perspective {
            fov_y_degrees: parse_f32(optional_text(node, "fov"), 75.0)?,
        },
        Some(other) => return Err(anyhow!("unknown projection {other}")),
    };
    Ok(CameraSpec {
        projection,
        near: parse_f32(optional_text(node, "near"), 0.1)?,
        far: parse_f32(optional_text(node, "far"), 1000.0)?,
        position: parse_vec3(optional_text(node, "position"), Vec3::ZERO)?,
        ready_position: optional_text(node, "ready-position")
            .map(|text| parse_vec3(Some(text), Vec3::ZERO))
            .transpose()?,
    })
}

fn parse_transition(node: &Node<'_, '_>) -> Result<TransitionConfig> {
    let defaults = TransitionConfig::default();
    let duration_ms = parse_f64(optional_text(node, "duration"), defaults.duration_ms)?;
    let settle_ms = parse_f64(optional_text(node, "settle"), defaults.settle_ms)?;
    ensure_non_negative("duration", duration_ms)?;
    ensure_non_negative("settle", settle_ms)?;
    Ok(TransitionConfig {
        duration_ms,
        settle_ms,
    })
}

fn parse_model(node: &Node<'_, '_>) -> Result<ModelSpec> {
    let destination = Destination::new(required_text(node, "destination")?)?;
    let clickable = child(node, "clickable")
        .map(|area| -> Result<ClickableArea> {
            Ok(ClickableArea {
                offset: parse_vec3(optional_text(&area, "offset"), Vec3::ZERO)?,
                radius: parse_f32(optional_text(&area, "radius"), 1.0)?,
            })
        })
        .transpose()?;
    Ok(ModelSpec {
        path: required_text(node, "path")?,
        position: parse_vec3(optional_text(node, "position"), Vec3::ZERO)?,
        rotation: parse_vec3(optional_text(node, "rotation"), Vec3::ZERO)?,
        scale: parse_vec3(optional_text(node, "scale"), Vec3::ONE)?,
        destination,
        clickable,
    })
}

fn parse_spin(node: &Node<'_, '_>) -> Result<SpinSpec> {
    let defaults = SpinSpec::default();
    let spec = SpinSpec {
        speed: parse_f32(optional_text(node, "speed"), defaults.speed)?,
        toggle_on_click: parse_bool(optional_text(node, "toggle-on-click"), defaults.toggle_on_click)?,
        spinning: parse_bool(optional_text(node, "spinning"), defaults.spinning)?,
        wheel_factor: optional_text(node, "wheel-factor")
            .map(|text| parse_f32(Some(text), 0.0))
            .transpose()?,
        min_speed: parse_f32(optional_text(node, "min"), defaults.min_speed)?,
        max_speed: parse_f32(optional_text(node, "max"), defaults.max_speed)?,
    };
    ensure_range(spec.min_speed, spec.max_speed)?;
    if !spec.speed.is_finite() || spec.wheel_factor.is_some_and(|factor| !factor.is_finite()) {
        return Err(anyhow!("spin speed and wheel factor must be finite"));
    }
    Ok(spec)
}

fn parse_converge(node: &Node<'_, '_>) -> Result<ConvergeSpec> {
    Ok(ConvergeSpec {
        speed: parse_f32(optional_text(node, "speed"), ConvergeSpec::default().speed)?,
    })
}

fn parse_rail(node: &Node<'_, '_>) -> Result<RailSpec> {
    let airship = child(node, "airship").ok_or_else(|| anyhow!("<airship> tag is missing"))?;
    let horizon = child(node, "horizon").ok_or_else(|| anyhow!("<horizon> tag is missing"))?;
    let factor = parse_f32(optional_text(node, "factor"), 0.01)?;
    if !factor.is_finite() {
        return Err(anyhow!("rail factor must be finite"));
    }
    let min = parse_f32(optional_text(node, "min"), 0.0)?;
    let max = parse_f32(optional_text(node, "max"), f32::MAX)?;
    ensure_range(min, max)?;
    Ok(RailSpec {
        factor,
        min,
        max,
        airship: AirshipSpec {
            position: parse_vec3(optional_text(&airship, "position"), Vec3::ZERO)?,
            scale: parse_vec3(optional_text(&airship, "scale"), Vec3::ONE)?,
        },
        horizon_start: parse_vec3(Some(required_text(&horizon, "start")?), Vec3::ZERO)?,
        horizon_end: parse_vec3(Some(required_text(&horizon, "end")?), Vec3::ZERO)?,
    })
}

fn parse_starfield(node: &Node<'_, '_>) -> Result<StarfieldSpec> {
    let defaults = StarfieldSpec::default();
    let spec = StarfieldSpec {
        count: match optional_text(node, "count") {
            Some(text) => text
                .parse::<usize>()
                .map_err(|err| anyhow!("failed to parse star count: {err}"))?,
            None => defaults.count,
        },
        extent: parse_f32(optional_text(node, "extent"), defaults.extent)?,
        interval_ms: parse_f64(optional_text(node, "interval"), defaults.interval_ms)?,
        visible_probability: parse_f64(
            optional_text(node, "probability"),
            defaults.visible_probability,
        )?,
        seed: optional_text(node, "seed")
            .map(|text| {
                text.parse::<u64>()
                    .map_err(|err| anyhow!("failed to parse seed: {err}"))
            })
            .transpose()?,
    };
    if !(0.0..=1.0).contains(&spec.visible_probability) {
        return Err(anyhow!(
            "star probability must lie in [0, 1], found {}",
            spec.visible_probability
        ));
    }
    if !spec.interval_ms.is_finite() || spec.interval_ms <= 0.0 {
        return Err(anyhow!(
            "star interval must be a positive number of milliseconds, found {}",
            spec.interval_ms
        ));
    }
    if !spec.extent.is_finite() {
        return Err(anyhow!("star extent must be finite"));
    }
    Ok(spec)
}

fn ensure_range(min: f32, max: f32) -> Result<()> {
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(anyhow!("invalid range: min {min} and max {max}"));
    }
    Ok(())
}

fn ensure_non_negative(tag: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!("<{tag}> must be a non-negative number, found {value}"));
    }
    Ok(())
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let components = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid vector component {component:?}: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    match components.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!("vector {value:?} must have three components")),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

fn parse_f64(value: Option<String>, default: f64) -> Result<f64> {
    match value {
        Some(value) => value
            .parse::<f64>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some("false") | Some("0") | Some("no") => Ok(false),
        Some(other) => Err(anyhow!("expected a boolean, found {other:?}")),
        None => Ok(default),
    }
}
