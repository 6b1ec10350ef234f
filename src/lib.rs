//! Maskpack: face-mask datasets packed for training.
//!
//! Maskpack turns a directory tree of face-mask images into fixed-shape,
//! random-access containers (one 224x224 RGB row per sample) and opens them
//! again as train/test datasets with per-sample transforms.
//!
//! # Modules
//!
//! - [`annotation`]: VOC-style annotation parsing and the label/size dictionaries
//! - [`index`]: image discovery for classification and detection splits
//! - [`container`]: the packed container format, writer and reader
//! - [`convert`]: the conversion passes behind `maskpack convert`
//! - [`crop`]: per-object cropped container
//! - [`dataset`]: datasets, splits and [`dataset::load_dataset`]
//! - [`transform`]: retrieval-time transforms and normalization constants
//! - [`error`]: error types for maskpack operations

pub mod annotation;
pub mod config;
pub mod container;
pub mod convert;
pub mod crop;
pub mod dataset;
pub mod error;
pub mod index;
pub mod pixels;
pub mod transform;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{ConvertOptions, DatasetLayout, LoadOptions, DEFAULT_ROOT};
use crate::dataset::Target;

pub use error::MaskpackError;

/// The maskpack CLI application.
#[derive(Parser)]
#[command(name = "maskpack")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Dataset root holding train/, test/ and detection/.
    #[arg(long, global = true, default_value = DEFAULT_ROOT, env = "MASKPACK_ROOT")]
    root: PathBuf,

    /// YAML file overriding individual layout entries; takes precedence over --root.
    #[arg(long, global = true)]
    layout: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build containers from the source images.
    Convert(ConvertArgs),
    /// Open a dataset and print its split sizes.
    Inspect(InspectArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Which passes to run ('all', 'train', 'test' or 'detection').
    #[arg(long, default_value = "all")]
    mode: String,

    /// Seed for the train-split shuffle.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(clap::Args)]
struct InspectArgs {
    /// Dataset name ('single_person', 'detection' or 'cropped').
    dataset: String,

    /// Seed for the open-time partition and augmentation.
    #[arg(long)]
    seed: Option<u64>,
}

/// Run the maskpack CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), MaskpackError> {
    let cli = Cli::parse();
    let layout = match &cli.layout {
        Some(path) => DatasetLayout::from_yaml_file(path)?,
        None => DatasetLayout::from_root(&cli.root),
    };

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args, &layout),
        Some(Commands::Inspect(args)) => run_inspect(args, &layout),
        None => {
            println!("maskpack {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Packs face-mask datasets into training containers.");
            println!();
            println!("Run 'maskpack --help' for usage information.");
            Ok(())
        }
    }
}

fn run_convert(args: ConvertArgs, layout: &DatasetLayout) -> Result<(), MaskpackError> {
    let opts = ConvertOptions {
        seed: args.seed,
        ..ConvertOptions::default()
    };
    if convert::run_mode(&args.mode, layout, &opts)? {
        println!("Converted mode '{}'", args.mode);
    }
    Ok(())
}

fn run_inspect(args: InspectArgs, layout: &DatasetLayout) -> Result<(), MaskpackError> {
    let opts = LoadOptions {
        seed: args.seed,
        ..LoadOptions::default()
    };
    let Some(splits) = dataset::load_dataset_by_name(&args.dataset, layout, &opts)? else {
        return Ok(());
    };

    println!("Dataset: {}", args.dataset);
    println!("  train: {} sample(s)", splits.train.len());
    println!("  test:  {} sample(s)", splits.test.len());

    if !splits.train.is_empty() {
        let sample = splits.train.get(0)?;
        let (c, h, w) = sample.image.dims();
        println!("  first train sample: {c}x{h}x{w}");
        match sample.target {
            Target::Class(code) => println!("  label: {code}"),
            Target::Detection { key, record } => println!(
                "  annotation: {key} ({}x{}, {} object(s))",
                record.size.width,
                record.size.height,
                record.objects.len()
            ),
        }
    }
    Ok(())
}
