//! Merge and flatten commands.

use crate::{FlattenArgs, MergeArgs};
use anyhow::{bail, Context, Result};
use std::path::Path;
use strata_doc::{BoundsPolicy, Document, LayerId};

fn layer_id(doc: &Document, name: &str) -> Result<LayerId> {
    match doc.layer_by_name(name) {
        Some(layer) => Ok(layer.id()),
        None => bail!("No layer named '{}'", name),
    }
}

fn print_result(doc: &Document, id: LayerId) {
    if let Some(layer) = doc.layer(id) {
        let position = doc.layer_index(id).unwrap_or_default();
        println!(
            "Merged into '{}' at position {}: {} {}",
            layer.name,
            position,
            layer.bounds(),
            layer.format()
        );
    }
    println!("Layers now: {}", doc.layers().len());
}

pub fn run(args: MergeArgs, config: Option<&Path>) -> Result<()> {
    let mut doc = super::load_document(&args.scene, config)?;
    let policy: BoundsPolicy = args.policy.parse()?;

    let merged = if args.visible {
        doc.merge_visible_layers(policy)
    } else if let Some(name) = &args.down {
        let id = layer_id(&doc, name)?;
        doc.merge_down(id, policy)
    } else {
        if args.layers.len() < 2 {
            bail!("Name at least two layers with --layer, or use --visible / --down");
        }
        let ids = args
            .layers
            .iter()
            .map(|n| layer_id(&doc, n))
            .collect::<Result<Vec<_>>>()?;
        doc.merge_layers(&ids, policy)
    };
    let merged = match merged {
        Ok(id) => id,
        Err(e) => {
            super::print_diagnostics(&mut doc);
            return Err(e).context("Merge failed");
        }
    };

    print_result(&doc, merged);
    if let (Some(out), Some(layer)) = (&args.output, doc.layer(merged)) {
        super::save_pam(out, layer.buffer(), doc.colormap())?;
    }
    super::print_diagnostics(&mut doc);
    Ok(())
}

pub fn run_flatten(args: FlattenArgs, config: Option<&Path>) -> Result<()> {
    let mut doc = super::load_document(&args.scene, config)?;
    let id = match doc.flatten() {
        Ok(id) => id,
        Err(e) => {
            super::print_diagnostics(&mut doc);
            return Err(e).context("Flatten failed");
        }
    };
    print_result(&doc, id);
    if let (Some(out), Some(layer)) = (&args.output, doc.layer(id)) {
        super::save_pam(out, layer.buffer(), doc.colormap())?;
    }
    Ok(())
}
