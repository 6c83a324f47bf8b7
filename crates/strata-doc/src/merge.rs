//! Merging layers into one.
//!
//! A merge composites a chosen set of layers bottom to top into a freshly
//! seeded target, then replaces them with the result in a single undo
//! group. The [`BoundsPolicy`] decides the target extent:
//!
//! | Policy              | Target extent                                  |
//! |---------------------|------------------------------------------------|
//! | `ExpandToUnion`     | union of the merged layers                     |
//! | `ClipToDocument`    | that union clipped to the document             |
//! | `ClipToBottomLayer` | the bottommost merged layer                    |
//! | `Flatten`           | the document, seeded with the background color |
//!
//! Merges are all-or-nothing: an incompatible layer, empty bounds or a
//! failed allocation leaves the document as it was and records exactly one
//! diagnostic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strata_core::{ColorModel, FormatDescriptor, PixelBuffer, Rect};
use strata_ops::{BlendMode, OpsError};
use tracing::debug;

use crate::compositor::LayerCompositor;
use crate::document::Document;
use crate::error::{DocError, DocResult};
use crate::layer::{Layer, LayerId};
use crate::undo::{UndoGroup, UndoRecord};

const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Extent of a merge result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    #[default]
    ExpandToUnion,
    ClipToDocument,
    ClipToBottomLayer,
    Flatten,
}

impl BoundsPolicy {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ExpandToUnion => "expand_to_union",
            Self::ClipToDocument => "clip_to_document",
            Self::ClipToBottomLayer => "clip_to_bottom_layer",
            Self::Flatten => "flatten",
        }
    }
}

impl fmt::Display for BoundsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoundsPolicy {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "expand_to_union" | "expand" => Ok(Self::ExpandToUnion),
            "clip_to_document" | "clip" => Ok(Self::ClipToDocument),
            "clip_to_bottom_layer" | "bottom" => Ok(Self::ClipToBottomLayer),
            "flatten" => Ok(Self::Flatten),
            _ => Err(OpsError::InvalidParameter(format!("unknown bounds policy '{s}'")).into()),
        }
    }
}

/// A built but not yet committed merge result.
struct Merged {
    layer: Layer,
    /// Stack indices consumed by the merge, top first.
    consumed: Vec<usize>,
    /// Insert position once the consumed layers are gone.
    position: usize,
}

impl Document {
    /// Merges the given layers. Argument order does not matter; layers are
    /// composited in stack order.
    pub fn merge_layers(&mut self, ids: &[LayerId], policy: BoundsPolicy) -> DocResult<LayerId> {
        let indices = self.resolve_merge_set(ids, policy)?;
        let merged = self.build_merge(&indices, policy)?;
        Ok(self.commit_merge(merged, policy))
    }

    /// Merges every visible layer.
    pub fn merge_visible_layers(&mut self, policy: BoundsPolicy) -> DocResult<LayerId> {
        let ids: Vec<LayerId> = self.layers.iter().filter(|l| l.visible).map(Layer::id).collect();
        if ids.len() < 2 && policy != BoundsPolicy::Flatten {
            let err = DocError::NotEnoughLayers(format!("{} visible layer(s), need two", ids.len()));
            return Err(self.report(err));
        }
        self.merge_layers(&ids, policy)
    }

    /// Merges a layer with the next visible layer below it.
    pub fn merge_down(&mut self, id: LayerId, policy: BoundsPolicy) -> DocResult<LayerId> {
        let idx = self.find_layer(id)?;
        let below = self.layers[idx + 1..].iter().find(|l| l.visible).map(Layer::id);
        let Some(below) = below else {
            let err = DocError::NotEnoughLayers(format!("no visible layer below {id}"));
            return Err(self.report(err));
        };
        self.merge_layers(&[id, below], policy)
    }

    /// Collapses all visible layers onto the background. Hidden layers are
    /// discarded. The result has no alpha unless
    /// [`keep_alpha_on_flatten`](crate::EngineConfig::keep_alpha_on_flatten)
    /// is set.
    pub fn flatten(&mut self) -> DocResult<LayerId> {
        let ids: Vec<LayerId> = self.layers.iter().filter(|l| l.visible).map(Layer::id).collect();
        if ids.is_empty() {
            return Err(self.report(DocError::NotEnoughLayers("nothing visible to flatten".into())));
        }
        self.merge_layers(&ids, BoundsPolicy::Flatten)
    }

    /// Builds the merge result without touching the stack.
    pub fn merge_copy(&mut self, ids: &[LayerId], policy: BoundsPolicy) -> DocResult<Layer> {
        let indices = self.resolve_merge_set(ids, policy)?;
        let merged = self.build_merge(&indices, policy)?;
        Ok(merged.layer)
    }

    /// Stack indices of `ids`, top first, without duplicates.
    fn resolve_merge_set(&mut self, ids: &[LayerId], policy: BoundsPolicy) -> DocResult<Vec<usize>> {
        let mut indices = Vec::with_capacity(ids.len());
        for id in ids {
            indices.push(self.find_layer(*id)?);
        }
        indices.sort_unstable();
        indices.dedup();
        let needed = if policy == BoundsPolicy::Flatten { 1 } else { 2 };
        if indices.len() < needed {
            let err = DocError::NotEnoughLayers(format!("{} layer(s) selected for {policy}", indices.len()));
            return Err(self.report(err));
        }
        Ok(indices)
    }

    fn merge_bounds(&self, indices: &[usize], policy: BoundsPolicy) -> Rect {
        let union = || {
            indices
                .iter()
                .map(|i| self.layers[*i].bounds())
                .fold(Rect::default(), |acc, r| acc.union(&r))
        };
        match policy {
            BoundsPolicy::ExpandToUnion => union(),
            BoundsPolicy::ClipToDocument => union().intersect(&self.bounds()).unwrap_or_default(),
            BoundsPolicy::ClipToBottomLayer => indices
                .last()
                .map(|i| self.layers[*i].bounds())
                .unwrap_or_default(),
            BoundsPolicy::Flatten => self.bounds(),
        }
    }

    /// Seed value of a document-sized merge target.
    fn background_pixel(&self, format: FormatDescriptor) -> Vec<f32> {
        if format.has_alpha {
            return vec![0.0; format.channels()];
        }
        let bg = self.config.background;
        match format.model {
            ColorModel::Rgb => bg.to_vec(),
            ColorModel::Gray => vec![bg[0] * LUMA[0] + bg[1] * LUMA[1] + bg[2] * LUMA[2]],
            ColorModel::Indexed => vec![nearest_index(&self.colormap, bg) as f32],
        }
    }

    fn build_merge(&mut self, indices: &[usize], policy: BoundsPolicy) -> DocResult<Merged> {
        let bounds = self.merge_bounds(indices, policy);
        if bounds.is_empty() {
            return Err(self.report(DocError::EmptyBounds));
        }
        let Some(&bottom_idx) = indices.last() else {
            return Err(self.report(DocError::NotEnoughLayers("no layers selected".into())));
        };
        let bottom = &self.layers[bottom_idx];
        let to_background = policy == BoundsPolicy::Flatten || bottom.format().model.is_indexed();
        let bottom_name = bottom.name.clone();
        let bottom_mode = bottom.mode;

        let (target_rect, target) = if to_background {
            let format = self.format.with_alpha(self.config.keep_alpha_on_flatten);
            let seed = self.background_pixel(format);
            let target = PixelBuffer::filled(format, self.width, self.height, &seed);
            (self.bounds(), target)
        } else {
            let format = bottom.format().with_alpha(true);
            (bounds, PixelBuffer::try_new(format, bounds.width, bounds.height))
        };
        let mut target = target.map_err(|e| self.report(e.into()))?;
        let area = if to_background {
            bounds.intersect(&target_rect).unwrap_or_default()
        } else {
            bounds
        };

        debug!(doc = %self.id, %policy, layers = indices.len(), %area, format = %target.format(), "merging");
        let compositor =
            LayerCompositor::new(target.format(), &self.colormap).with_origin(target_rect.x, target_rect.y);
        let mut failure = None;
        for &i in indices.iter().rev() {
            let layer = &self.layers[i];
            let mode = if i == bottom_idx && !to_background {
                BlendMode::Normal
            } else {
                layer.mode
            };
            if let Err(e) = compositor.combine_as(&mut target, area, layer, mode) {
                failure = Some(e);
                break;
            }
        }
        if let Some(e) = failure {
            return Err(self.report(e));
        }

        let result = self.new_layer_from(bottom_name, target);
        let (layer, position) = if to_background {
            (result, self.layers.len() - indices.len())
        } else {
            let layer = result.with_offset(target_rect.x, target_rect.y).with_mode(bottom_mode);
            (layer, bottom_idx + 1 - indices.len())
        };
        Ok(Merged {
            layer,
            consumed: indices.to_vec(),
            position,
        })
    }

    fn commit_merge(&mut self, merged: Merged, policy: BoundsPolicy) -> LayerId {
        let Merged {
            layer,
            mut consumed,
            mut position,
        } = merged;
        let group = if policy == BoundsPolicy::Flatten {
            consumed = (0..self.layers.len()).collect();
            position = 0;
            UndoGroup::Flatten
        } else {
            UndoGroup::Merge
        };

        self.undo_group_start(group);
        let mut damage = layer.bounds();
        for &i in consumed.iter().rev() {
            let removed = self.layers.remove(i);
            damage = damage.union(&removed.bounds());
            self.push_undo(UndoRecord::LayerRemoved {
                layer: Box::new(removed),
                position: i,
            });
        }
        let id = layer.id();
        let position = position.min(self.layers.len());
        self.push_undo(UndoRecord::LayerAdded { layer: id, position });
        self.layers.insert(position, layer);
        self.undo_group_end();

        self.active_layer = Some(id);
        debug!(doc = %self.id, layer = %id, position, removed = consumed.len(), "merge committed");
        self.structure_changed(damage);
        id
    }
}

/// Colormap entry closest to `color`, 0 for an empty map.
fn nearest_index(colormap: &[[f32; 3]], color: [f32; 3]) -> usize {
    colormap
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let d: f32 = c.iter().zip(&color).map(|(a, b)| (a - b) * (a - b)).sum();
            (i, d)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(0, |(i, _)| i)
}
