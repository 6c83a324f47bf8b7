//! Projection and preview output.

use crate::{PreviewArgs, ProjectArgs};
use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

/// Composites the requested region and writes or prints it.
pub fn run(args: ProjectArgs, config: Option<&Path>) -> Result<()> {
    let mut doc = super::load_document(&args.scene, config)?;
    let area = match &args.region {
        Some(s) => super::parse_rect(s)?,
        None => doc.bounds(),
    };
    let Some(area) = area.intersect(&doc.bounds()) else {
        bail!("Region {} lies outside the {}x{} canvas", area, doc.width(), doc.height());
    };
    let flat = doc.is_flat();

    let projection = doc.projection(area).context("Projection failed")?.clone();
    info!(%area, flat, rebuilds = doc.rebuild_count(), "projection ready");

    if let Some(p) = &args.pixel {
        let (x, y) = super::parse_point(p)?;
        if !doc.bounds().contains(x, y) {
            bail!("Pixel {},{} lies outside the canvas", x, y);
        }
        if !area.contains(x, y) {
            bail!("Pixel {},{} lies outside region {}", x, y, area);
        }
        let px = projection.pixel(x as u32, y as u32);
        let values: Vec<String> = px.iter().map(|v| format!("{v:.4}")).collect();
        println!("{x},{y}: [{}]", values.join(", "));
    }

    if let Some(out) = &args.output {
        let region = projection.crop(area).context("Failed to crop projection")?;
        super::save_pam(out, &region, doc.colormap())?;
    }
    super::print_diagnostics(&mut doc);
    Ok(())
}

/// Writes a down-scaled composite.
pub fn run_preview(args: PreviewArgs, config: Option<&Path>) -> Result<()> {
    let mut doc = super::load_document(&args.scene, config)?;
    let preview = doc
        .composite_preview(args.width, args.height)
        .context("Preview failed")?
        .clone();
    super::save_pam(&args.output, &preview, doc.colormap())?;
    super::print_diagnostics(&mut doc);
    Ok(())
}
