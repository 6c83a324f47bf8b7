//! strata - inspect, project and merge layered raster scenes
//!
//! Scenes are YAML descriptions of a document and its layer stack (see
//! `strata_doc::scene`). Results are written as PAM (`P7`) images.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about = "Layered raster document tool")]
#[command(long_about = "
Builds a layered document from a YAML scene and runs projection or merge
operations on it.

Examples:
  strata info scene.yaml                       # Stack summary and flatness
  strata project scene.yaml -o out.pam         # Composite the whole canvas
  strata project scene.yaml --pixel 12,4       # Print one projected pixel
  strata merge scene.yaml -l ink -l paper --policy clip-to-document -o m.pam
  strata merge scene.yaml --visible
  strata flatten scene.yaml -o flat.pam
  strata preview scene.yaml -W 64 -H 48 -o thumb.pam
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Engine configuration file, replaces the scene's `config:` section
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the document, its layers and channels
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Composite a region of the document
    #[command(visible_alias = "p")]
    Project(ProjectArgs),

    /// Merge layers into one
    #[command(visible_alias = "m")]
    Merge(MergeArgs),

    /// Collapse all visible layers onto the background
    Flatten(FlattenArgs),

    /// Down-scaled composite
    Preview(PreviewArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Scene file
    scene: PathBuf,
}

#[derive(Args)]
struct ProjectArgs {
    /// Scene file
    scene: PathBuf,

    /// Output image (PAM)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Region to composite: x,y,w,h (default: whole canvas)
    #[arg(short, long)]
    region: Option<String>,

    /// Print the projected pixel at x,y
    #[arg(long)]
    pixel: Option<String>,
}

#[derive(Args)]
struct MergeArgs {
    /// Scene file
    scene: PathBuf,

    /// Layer names to merge (repeatable)
    #[arg(short, long = "layer")]
    layers: Vec<String>,

    /// Merge every visible layer
    #[arg(long, conflicts_with_all = ["layers", "down"])]
    visible: bool,

    /// Merge the named layer into the next visible layer below it
    #[arg(long, conflicts_with = "layers")]
    down: Option<String>,

    /// Bounds policy: expand-to-union, clip-to-document, clip-to-bottom-layer
    #[arg(short, long, default_value = "expand-to-union")]
    policy: String,

    /// Write the merged layer (PAM)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct FlattenArgs {
    /// Scene file
    scene: PathBuf,

    /// Output image (PAM)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct PreviewArgs {
    /// Scene file
    scene: PathBuf,

    /// Preview width
    #[arg(short = 'W', long, default_value = "64")]
    width: u32,

    /// Preview height
    #[arg(short = 'H', long, default_value = "64")]
    height: u32,

    /// Output image (PAM)
    #[arg(short, long)]
    output: PathBuf,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Info(args) => commands::info::run(args, config),
        Commands::Project(args) => commands::project::run(args, config),
        Commands::Merge(args) => commands::merge::run(args, config),
        Commands::Flatten(args) => commands::merge::run_flatten(args, config),
        Commands::Preview(args) => commands::project::run_preview(args, config),
    }
}
