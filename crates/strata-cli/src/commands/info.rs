//! Document summary: canvas, layer stack, channels and flatness.

use crate::InfoArgs;
use anyhow::Result;
use std::path::Path;

pub fn run(args: InfoArgs, config: Option<&Path>) -> Result<()> {
    let mut doc = super::load_document(&args.scene, config)?;

    println!("{}", args.scene.display());
    println!("  Canvas:     {}x{} {}", doc.width(), doc.height(), doc.format());
    println!("  Flat:       {}", if doc.is_flat() { "yes" } else { "no" });
    if !doc.colormap().is_empty() {
        println!("  Colormap:   {} entries", doc.colormap().len());
    }

    println!("  Layers:     {}", doc.layers().len());
    for (i, layer) in doc.layers().iter().enumerate() {
        let mut flags = Vec::new();
        if !layer.is_visible() {
            flags.push("hidden");
        }
        if layer.is_floating() {
            flags.push("floating");
        }
        if layer.preserve_transparency() {
            flags.push("preserve-alpha");
        }
        if layer.mask().is_some() {
            flags.push(if layer.apply_mask() { "mask" } else { "mask-off" });
        }
        let active = if doc.active_layer() == Some(layer.id()) { "*" } else { " " };
        println!(
            "   {active}{i:>3} {:<16} {} {} opacity={:.2} mode={} {}",
            layer.name,
            layer.bounds(),
            layer.format(),
            layer.opacity(),
            layer.mode(),
            flags.join(",")
        );
    }

    if !doc.channels().is_empty() {
        println!("  Channels:   {}", doc.channels().len());
        for (i, channel) in doc.channels().iter().enumerate() {
            let [r, g, b] = channel.color();
            println!(
                "    {i:>3} {:<16} color=({r:.2},{g:.2},{b:.2}) opacity={:.2}{}",
                channel.name,
                channel.opacity(),
                if channel.is_visible() { "" } else { " hidden" }
            );
        }
    }
    println!("  Selection:  {}", if doc.has_selection() { "yes" } else { "none" });

    super::print_diagnostics(&mut doc);
    Ok(())
}
