//! CLI command implementations

pub mod info;
pub mod merge;
pub mod project;

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use strata_core::{ColorModel, PixelBuffer, Precision, Rect};
use strata_doc::{Document, EngineConfig, Scene};
use tracing::{debug, info};

/// Builds the document described by a scene file.
///
/// A `config` file, when given, replaces the scene's own `config:` section.
pub fn load_document(scene: &Path, config: Option<&Path>) -> Result<Document> {
    let mut parsed = Scene::from_file(scene).with_context(|| format!("Failed to load scene: {}", scene.display()))?;
    if let Some(path) = config {
        parsed.config =
            EngineConfig::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))?;
    }
    let doc = parsed
        .build()
        .with_context(|| format!("Failed to build document from {}", scene.display()))?;
    debug!(doc = %doc.id(), layers = doc.layers().len(), "scene loaded");
    Ok(doc)
}

/// Parses `x,y,w,h`.
pub fn parse_rect(s: &str) -> Result<Rect> {
    let v = parse_ints(s)?;
    let &[x, y, w, h] = v.as_slice() else {
        bail!("Expected x,y,w,h, got '{}'", s);
    };
    if w <= 0 || h <= 0 {
        bail!("Region '{}' has no area", s);
    }
    Ok(Rect::new(x as i32, y as i32, w as u32, h as u32))
}

/// Parses `x,y`.
pub fn parse_point(s: &str) -> Result<(i32, i32)> {
    let v = parse_ints(s)?;
    let &[x, y] = v.as_slice() else {
        bail!("Expected x,y, got '{}'", s);
    };
    Ok((x as i32, y as i32))
}

fn parse_ints(s: &str) -> Result<Vec<i64>> {
    s.split(',')
        .map(|p| {
            p.trim()
                .parse::<i64>()
                .with_context(|| format!("Invalid number '{}' in '{}'", p.trim(), s))
        })
        .collect()
}

/// Prints and drains the document's diagnostics.
pub fn print_diagnostics(doc: &mut Document) {
    let diags = doc.take_diagnostics();
    if diags.is_empty() {
        return;
    }
    println!("Diagnostics:");
    for d in diags {
        println!("  {:?}: {}", d.kind, d.message);
    }
}

/// Writes `buffer` as a PAM image. Indexed buffers are expanded through
/// `colormap`.
pub fn save_pam(path: &Path, buffer: &PixelBuffer, colormap: &[[f32; 3]]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_pam(&mut writer, buffer, colormap)
        .and_then(|_| writer.flush())
        .with_context(|| format!("Failed to write: {}", path.display()))?;
    let (w, h) = buffer.dimensions();
    info!("wrote {} ({}x{}, {})", path.display(), w, h, buffer.format());
    Ok(())
}

/// PAM encoding: 8-bit samples for U8 buffers, 16-bit big-endian otherwise.
pub fn write_pam<W: Write>(out: &mut W, buffer: &PixelBuffer, colormap: &[[f32; 3]]) -> std::io::Result<()> {
    let fmt = buffer.format();
    let indexed = fmt.model == ColorModel::Indexed;
    let colors = if indexed { 3 } else { fmt.model.color_components() };
    let depth = colors + usize::from(fmt.has_alpha);
    let tupltype = match (colors, fmt.has_alpha) {
        (1, false) => "GRAYSCALE",
        (1, true) => "GRAYSCALE_ALPHA",
        (_, false) => "RGB",
        (_, true) => "RGB_ALPHA",
    };
    let maxval: u32 = if fmt.precision == Precision::U8 { 255 } else { 65535 };
    let (w, h) = buffer.dimensions();
    write!(
        out,
        "P7\nWIDTH {w}\nHEIGHT {h}\nDEPTH {depth}\nMAXVAL {maxval}\nTUPLTYPE {tupltype}\nENDHDR\n"
    )?;

    let mut sample = |v: f32| -> std::io::Result<()> {
        let q = (v.clamp(0.0, 1.0) * maxval as f32).round() as u32;
        if maxval == 255 {
            out.write_all(&[q as u8])
        } else {
            out.write_all(&(q as u16).to_be_bytes())
        }
    };
    for y in 0..h {
        for x in 0..w {
            let px = buffer.pixel(x, y);
            if indexed {
                let entry = colormap.get(px[0] as usize).copied().unwrap_or([0.0; 3]);
                for c in entry {
                    sample(c)?;
                }
            } else {
                for c in &px[..colors] {
                    sample(*c)?;
                }
            }
            if let Some(a) = fmt.alpha_index() {
                sample(px[a])?;
            }
        }
    }
    Ok(())
}
