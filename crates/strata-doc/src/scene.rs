//! YAML scene descriptions.
//!
//! A scene declares a document and its stack so that documents can be
//! built from files by tools and tests:
//!
//! ```yaml
//! width: 64
//! height: 48
//! precision: u8          # u8 | u16 | f16 | f32
//! model: rgb             # rgb | gray | indexed
//! config:
//!   background: [1.0, 1.0, 1.0]
//! layers:                # top first
//!   - name: ink
//!     size: [16, 16]
//!     offset: [8, 8]
//!     alpha: true
//!     fill: [1.0, 0.0, 0.0, 1.0]
//!     mode: multiply
//!     mask: 0.5
//!   - name: background
//!     fill: [1.0, 1.0, 1.0]
//! channels:
//!   - name: highlight
//!     fill: 1.0
//!     color: [0.0, 0.0, 1.0]
//!     opacity: 0.25
//! selection:
//!   - rect: [0, 0, 8, 8]
//!     value: [1.0]
//! ```
//!
//! Layer `size` defaults to the document size. `paint` lists rectangles
//! (layer coordinates) filled after `fill`.

use std::path::Path;

use serde::Deserialize;
use strata_core::{ColorModel, FormatDescriptor, Precision, Rect};
use strata_ops::BlendMode;
use tracing::debug;

use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::{DocError, DocResult};
use crate::layer::LayerId;

/// A rectangle fill.
#[derive(Debug, Clone, PartialEq)]
pub struct RectFill {
    pub rect: Rect,
    pub value: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub name: String,
    pub format: FormatDescriptor,
    pub size: Option<(u32, u32)>,
    pub offset: (i32, i32),
    pub fill: Option<Vec<f32>>,
    pub paint: Vec<RectFill>,
    pub opacity: f32,
    pub mode: BlendMode,
    pub visible: bool,
    pub mask: Option<f32>,
    pub apply_mask: bool,
    pub show_mask: bool,
    pub preserve_transparency: bool,
    pub floating: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub name: String,
    pub fill: f32,
    pub paint: Vec<RectFill>,
    pub color: [f32; 3],
    pub opacity: f32,
    pub show_masked: bool,
    pub visible: bool,
}

/// A parsed scene description.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub format: FormatDescriptor,
    pub config: EngineConfig,
    pub colormap: Vec<[f32; 3]>,
    /// Top first.
    pub layers: Vec<LayerSpec>,
    /// Top first.
    pub channels: Vec<ChannelSpec>,
    pub selection: Vec<RectFill>,
}

impl Scene {
    /// Loads a scene file.
    pub fn from_file(path: impl AsRef<Path>) -> DocResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parses a scene from YAML.
    pub fn from_yaml_str(yaml: &str) -> DocResult<Self> {
        let raw: RawScene = serde_yaml::from_str(yaml)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawScene) -> DocResult<Self> {
        let precision: Precision = parse_or(raw.precision.as_deref(), Precision::U8)?;
        let model: ColorModel = parse_or(raw.model.as_deref(), ColorModel::Rgb)?;
        let config = raw.config.unwrap_or_default().validate()?;

        let layers = raw
            .layers
            .unwrap_or_default()
            .into_iter()
            .map(|l| Self::parse_layer(l, precision, model))
            .collect::<DocResult<Vec<_>>>()?;
        let channels = raw
            .channels
            .unwrap_or_default()
            .into_iter()
            .map(Self::parse_channel)
            .collect::<DocResult<Vec<_>>>()?;
        let selection = raw
            .selection
            .unwrap_or_default()
            .into_iter()
            .map(parse_fill)
            .collect::<DocResult<Vec<_>>>()?;

        Ok(Self {
            width: raw.width,
            height: raw.height,
            format: FormatDescriptor::new(precision, model, false),
            config,
            colormap: raw.colormap.unwrap_or_default(),
            layers,
            channels,
            selection,
        })
    }

    fn parse_layer(raw: RawLayer, precision: Precision, model: ColorModel) -> DocResult<LayerSpec> {
        let precision = parse_or(raw.precision.as_deref(), precision)?;
        let model = parse_or(raw.model.as_deref(), model)?;
        let has_alpha = raw.alpha.unwrap_or(false);
        let mode = match raw.mode.as_deref() {
            Some(s) => s.parse::<BlendMode>()?,
            None => BlendMode::Normal,
        };
        let opacity = raw.opacity.unwrap_or(1.0);
        if !(0.0..=1.0).contains(&opacity) {
            return Err(DocError::Scene(format!("layer '{}': opacity {opacity} outside [0, 1]", raw.name)));
        }
        Ok(LayerSpec {
            format: FormatDescriptor::new(precision, model, has_alpha),
            size: raw.size.map(|[w, h]| (w, h)),
            offset: raw.offset.map_or((0, 0), |[x, y]| (x, y)),
            fill: raw.fill,
            paint: raw.paint.unwrap_or_default().into_iter().map(parse_fill).collect::<DocResult<_>>()?,
            opacity,
            mode,
            visible: raw.visible.unwrap_or(true),
            mask: raw.mask,
            apply_mask: raw.apply_mask.unwrap_or(true),
            show_mask: raw.show_mask.unwrap_or(false),
            preserve_transparency: raw.preserve_transparency.unwrap_or(false),
            floating: raw.floating.unwrap_or(false),
            name: raw.name,
        })
    }

    fn parse_channel(raw: RawChannel) -> DocResult<ChannelSpec> {
        Ok(ChannelSpec {
            fill: raw.fill.unwrap_or(0.0),
            paint: raw.paint.unwrap_or_default().into_iter().map(parse_fill).collect::<DocResult<_>>()?,
            color: raw.color.unwrap_or([0.0, 0.0, 0.0]),
            opacity: raw.opacity.unwrap_or(0.5),
            show_masked: raw.show_masked.unwrap_or(false),
            visible: raw.visible.unwrap_or(true),
            name: raw.name,
        })
    }

    /// Builds the document. Layer ids are assigned in file order.
    pub fn build(&self) -> DocResult<Document> {
        let mut doc = Document::new(self.width, self.height, self.format)?.with_config(self.config.clone());
        doc.set_colormap(self.colormap.clone());

        let mut ids: Vec<LayerId> = Vec::with_capacity(self.layers.len());
        for entry in &self.layers {
            let (w, h) = entry.size.unwrap_or((self.width, self.height));
            let mut layer = doc
                .new_layer(entry.name.clone(), entry.format, w, h)?
                .with_offset(entry.offset.0, entry.offset.1)
                .with_opacity(entry.opacity)
                .with_mode(entry.mode)
                .with_visible(entry.visible)
                .with_preserve_transparency(entry.preserve_transparency)
                .with_floating(entry.floating);
            if let Some(fill) = &entry.fill {
                layer = layer.filled(fill).map_err(|e| scene_error(&entry.name, e))?;
            }
            for p in &entry.paint {
                layer
                    .buffer_mut()
                    .fill_rect(p.rect, &p.value)
                    .map_err(|e| scene_error(&entry.name, e))?;
            }
            ids.push(layer.id());
            doc.add_layer(layer, Some(ids.len() - 1))?;
        }
        for (entry, id) in self.layers.iter().zip(&ids) {
            let Some(value) = entry.mask else { continue };
            let mask = doc.new_layer_mask(*id, value)?;
            doc.add_layer_mask(*id, mask)?;
            doc.set_mask_apply(*id, entry.apply_mask)?;
            doc.set_mask_show(*id, entry.show_mask)?;
        }

        for (i, entry) in self.channels.iter().enumerate() {
            let mut channel = doc
                .new_channel(entry.name.clone())
                .filled(entry.fill)
                .with_color(entry.color, entry.opacity)
                .with_show_masked(entry.show_masked)
                .with_visible(entry.visible);
            for p in &entry.paint {
                channel
                    .buffer_mut()
                    .fill_rect(p.rect, &p.value)
                    .map_err(|e| scene_error(&entry.name, e))?;
            }
            doc.add_channel(channel, Some(i))?;
        }

        for p in &self.selection {
            doc.update_selection(|s| s.fill_rect(p.rect, &p.value))
                .map_err(|e| scene_error("selection", e))?;
        }
        if let Some(top) = ids.first() {
            doc.set_active_layer(*top)?;
        }
        doc.take_diagnostics();
        debug!(doc = %doc.id(), layers = ids.len(), channels = self.channels.len(), "scene built");
        Ok(doc)
    }
}

fn scene_error(what: &str, err: strata_core::Error) -> DocError {
    DocError::Scene(format!("{what}: {err}"))
}

fn parse_or<T>(value: Option<&str>, default: T) -> DocResult<T>
where
    T: std::str::FromStr<Err = strata_core::Error>,
{
    match value {
        Some(s) => Ok(s.parse()?),
        None => Ok(default),
    }
}

fn parse_fill(raw: RawFill) -> DocResult<RectFill> {
    let [x, y, w, h] = raw.rect;
    if w < 0 || h < 0 {
        return Err(DocError::Scene(format!("negative rect size {w}x{h}")));
    }
    Ok(RectFill {
        rect: Rect::new(x, y, w as u32, h as u32),
        value: raw.value,
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScene {
    width: u32,
    height: u32,
    precision: Option<String>,
    model: Option<String>,
    config: Option<EngineConfig>,
    colormap: Option<Vec<[f32; 3]>>,
    layers: Option<Vec<RawLayer>>,
    channels: Option<Vec<RawChannel>>,
    selection: Option<Vec<RawFill>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLayer {
    name: String,
    precision: Option<String>,
    model: Option<String>,
    alpha: Option<bool>,
    size: Option<[u32; 2]>,
    offset: Option<[i32; 2]>,
    fill: Option<Vec<f32>>,
    paint: Option<Vec<RawFill>>,
    opacity: Option<f32>,
    mode: Option<String>,
    visible: Option<bool>,
    mask: Option<f32>,
    apply_mask: Option<bool>,
    show_mask: Option<bool>,
    preserve_transparency: Option<bool>,
    floating: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChannel {
    name: String,
    fill: Option<f32>,
    paint: Option<Vec<RawFill>>,
    color: Option<[f32; 3]>,
    opacity: Option<f32>,
    show_masked: Option<bool>,
    visible: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFill {
    rect: [i32; 4],
    value: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENE: &str = r#"
width: 8
height: 8
precision: f32
layers:
  - name: top
    size: [4, 4]
    offset: [2, 2]
    alpha: true
    fill: [1.0, 0.0, 0.0, 1.0]
    mode: screen
    mask: 0.5
  - name: bottom
    fill: [0.0, 0.0, 1.0]
channels:
  - name: c
    paint:
      - rect: [0, 0, 2, 2]
        value: [1.0]
selection:
  - rect: [1, 1, 1, 1]
    value: [1.0]
"#;

    #[test]
    fn test_parse_scene() {
        let scene = Scene::from_yaml_str(SCENE).unwrap();
        assert_eq!(scene.format, FormatDescriptor::rgb(Precision::F32));
        assert_eq!(scene.layers.len(), 2);
        assert_eq!(scene.layers[0].mode, BlendMode::Screen);
        assert_eq!(scene.layers[0].format, FormatDescriptor::rgba(Precision::F32));
        assert_eq!(scene.layers[1].size, None);
        assert_eq!(scene.channels[0].paint[0].rect, Rect::new(0, 0, 2, 2));
    }

    #[test]
    fn test_build_keeps_order() {
        let doc = Scene::from_yaml_str(SCENE).unwrap().build().unwrap();
        let names: Vec<&str> = doc.layers().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["top", "bottom"]);
        let top = &doc.layers()[0];
        assert_eq!(top.offset(), (2, 2));
        assert_eq!(top.mask().map(|m| m.buffer().pixel(0, 0)[0]), Some(0.5));
        assert_eq!(doc.active_layer(), Some(top.id()));
        assert_eq!(doc.channels()[0].buffer().pixel(1, 1), &[1.0]);
        assert!(doc.has_selection());
        assert!(doc.diagnostics().is_empty());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Scene::from_yaml_str("width: 4\nheight: 4\nmodel: cmyk\n").is_err());
        assert!(Scene::from_yaml_str("width: 4\nheight: 4\nbogus: 1\n").is_err());
        let bad_mode = "width: 4\nheight: 4\nlayers:\n  - name: a\n    mode: dissolve\n";
        assert!(Scene::from_yaml_str(bad_mode).is_err());
        let bad_fill = "width: 4\nheight: 4\nlayers:\n  - name: a\n    fill: [1.0]\n";
        assert!(matches!(
            Scene::from_yaml_str(bad_fill).unwrap().build(),
            Err(DocError::Scene(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENE.as_bytes()).unwrap();
        let scene = Scene::from_file(file.path()).unwrap();
        assert_eq!((scene.width, scene.height), (8, 8));
    }
}
