//! # make_mask_files
//!
//! Computes the evaluation point mask for every capture in the evaluation
//! subset of a split and freezes the results into a single zip archive. The
//! archive is the authoritative copy that scoring reads back.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;

use sweepflow::data_loader::FileCachingMode;
use sweepflow::evaluation::scene_flow::masks::{compute_eval_point_mask, MaskArchiveWriter};
use sweepflow::evaluation::scene_flow::{get_eval_subset, SceneFlowDataLoader};

/// Splits with a published evaluation subset.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Split {
    /// Validation split.
    Val,
    /// Test split.
    Test,
}

impl Split {
    fn as_str(self) -> &'static str {
        match self {
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(about = "Build the evaluation point-mask archive for a split.")]
struct Args {
    /// Path of the zip archive to create.
    output_file: PathBuf,
    /// Root directory holding the dataset, laid out as `<data_root>/<name>/<split>`.
    data_root: String,
    /// Dataset name under the root directory.
    #[arg(long, default_value = "av2")]
    name: String,
    /// Split to build the mask archive for.
    #[arg(long, value_enum, default_value_t = Split::Val)]
    split: Split,
    /// Cache directory for derived files. Defaults to the system temporary directory.
    #[arg(long)]
    file_cache: Option<PathBuf>,
}

/// Script entrypoint.
pub fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let file_caching_mode = match args.file_cache {
        Some(root) => FileCachingMode::Disk(root),
        None => FileCachingMode::default(),
    };
    let loader = SceneFlowDataLoader::new(
        &args.data_root,
        &args.name,
        args.split.as_str(),
        false,
        file_caching_mode,
    )?;
    let eval_indices = get_eval_subset(&loader);

    let mut writer = MaskArchiveWriter::create(&args.output_file)?;
    let bar = ProgressBar::new(eval_indices.len() as u64);
    for index in eval_indices {
        let sweep = loader.data_loader.get(index)?;
        let mask = compute_eval_point_mask(&sweep)?;
        writer.add(&sweep.sweep_uuid.0, sweep.sweep_uuid.1, &mask)?;
        bar.inc(1)
    }
    writer.finish()?;
    Ok(())
}
