//! # make_annotation_files
//!
//! Generates the ground-truth scene-flow artifacts for the evaluation subset
//! of a split. One feather file is written per evaluated capture, restricted
//! to the points named by the published mask archive.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;
use polars::lazy::dsl::cols;
use polars::prelude::Float32Type;

#[macro_use]
extern crate log;

use sweepflow::constants::XYZ_COLUMNS;
use sweepflow::data_loader::FileCachingMode;
use sweepflow::evaluation::scene_flow::artifacts::write_annotation_file;
use sweepflow::evaluation::scene_flow::flow::Flow;
use sweepflow::evaluation::scene_flow::masks::{
    compute_close_point_mask, masked_points, MaskArchive,
};
use sweepflow::evaluation::scene_flow::{get_eval_subset, SceneFlowDataLoader};
use sweepflow::io::ndarray_from_frame;

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
#[command(about = "Generate ground-truth scene-flow annotation files.")]
struct Args {
    /// Directory the per-capture annotation files are written into.
    output_root: PathBuf,
    /// Root directory holding the dataset, laid out as `<data_root>/<name>/<split>`.
    data_root: String,
    /// Zip archive of evaluation point masks for the split.
    mask_file: PathBuf,
    /// Dataset name under the root directory.
    #[arg(long, default_value = "av2")]
    name: String,
    /// Split to generate annotation files for.
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
    let data_loader = SceneFlowDataLoader::new(
        &args.data_root,
        &args.name,
        args.split.as_str(),
        false,
        file_caching_mode,
    )?;
    let mut mask_archive = MaskArchive::open(&args.mask_file)?;
    let eval_indices = get_eval_subset(&data_loader);

    let bar = ProgressBar::new(eval_indices.len() as u64);
    for index in eval_indices {
        let pair = data_loader.get(index)?;
        let (log_id, timestamp_ns) = pair.sweep.sweep_uuid.clone();
        if pair.next_sweep.is_none() {
            warn!("No successor capture for {log_id}/{timestamp_ns}. Skipping ...");
            bar.inc(1);
            continue;
        }

        let flow = Flow::from_sweep_pair(&pair)?;
        let mask = mask_archive.get(&log_id, timestamp_ns)?;
        let flow = flow.masked(&mask);

        let xyz = ndarray_from_frame::<Float32Type>(&pair.sweep.lidar, cols(XYZ_COLUMNS))?;
        let xyz = masked_points(&xyz.view(), &mask);
        let is_close = compute_close_point_mask(&xyz.view());

        write_annotation_file(
            &args.output_root,
            &log_id,
            timestamp_ns,
            &flow.classes,
            &is_close,
            &flow.dynamic,
            &flow.valid,
            &flow.flow.view(),
        )?;
        bar.inc(1)
    }
    Ok(())
}
