//! # masks
//!
//! Evaluation point masks.
//!
//! A point is eligible for scoring when it lies inside the evaluation region
//! and is not ground. `compute_eval_point_mask` derives that predicate from a
//! sweep; [`MaskArchive::get`] reads the frozen, authoritative copy that
//! submissions are scored against. Scoring must only ever use the archive:
//! the archive pins the exact point ordering and mask bits published with the
//! benchmark, while the computed predicate is free to evolve.

use std::fs;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use ndarray::{Array2, ArrayView2};
use polars::lazy::dsl::cols;
use polars::prelude::{DataFrame, Float32Type, NamedFrom};
use polars::series::Series;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::constants::{GROUND_COLUMN, XYZ_COLUMNS};
use crate::data_loader::Sweep;
use crate::errors::DataError;
use crate::evaluation::scene_flow::constants::{
    CLOSE_POINT_RADIUS_M, EVAL_POINT_RADIUS_M, MASK_COLUMN,
};
use crate::io::{ndarray_from_frame, read_feather_bytes, write_feather_bytes};

/// Compute the evaluation eligibility of every sweep point.
///
/// Ground classification is a prerequisite; a sweep without (complete) ground
/// labels raises a data-integrity error keyed by the capture.
pub fn compute_eval_point_mask(sweep: &Sweep) -> Result<Vec<bool>, DataError> {
    let (log_id, timestamp_ns) = &sweep.sweep_uuid;
    let missing = || DataError::MissingGroundLabels {
        log_id: log_id.clone(),
        timestamp_ns: *timestamp_ns,
    };
    let is_ground = match sweep.lidar.column(GROUND_COLUMN) {
        Ok(column) => column.bool()?,
        Err(_) => return Err(missing()),
    };
    if is_ground.null_count() > 0 {
        return Err(missing());
    }

    let xyz = ndarray_from_frame::<Float32Type>(&sweep.lidar, cols(XYZ_COLUMNS))?;
    Ok(xyz
        .outer_iter()
        .zip(is_ground.into_no_null_iter())
        .map(|(point, ground)| {
            point[0].abs() <= EVAL_POINT_RADIUS_M
                && point[1].abs() <= EVAL_POINT_RADIUS_M
                && !ground
        })
        .collect())
}

/// Flag the points lying within the close-range evaluation region.
pub fn compute_close_point_mask(points: &ArrayView2<f32>) -> Vec<bool> {
    points
        .outer_iter()
        .map(|point| {
            point[0].abs() <= CLOSE_POINT_RADIUS_M && point[1].abs() <= CLOSE_POINT_RADIUS_M
        })
        .collect()
}

/// Select the rows of `points` flagged by `mask`.
pub fn masked_points(points: &ArrayView2<f32>, mask: &[bool]) -> Array2<f32> {
    let kept: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter_map(|(row, &keep)| keep.then_some(row))
        .collect();
    let mut selected = Array2::<f32>::zeros((kept.len(), points.shape()[1]));
    for (k, &row) in kept.iter().enumerate() {
        selected.row_mut(k).assign(&points.row(row));
    }
    selected
}

/// Read-only handle over a bundled per-split mask archive.
pub struct MaskArchive {
    archive: ZipArchive<File>,
    path: PathBuf,
}

impl MaskArchive {
    /// Open the mask archive at `path`.
    pub fn open(path: &Path) -> Result<MaskArchive, DataError> {
        let file = File::open(path)
            .with_context(|| format!("Cannot open mask archive: {}.", path.display()))?;
        let archive = ZipArchive::new(file)?;
        Ok(MaskArchive {
            archive,
            path: path.to_path_buf(),
        })
    }

    /// Authoritative evaluation mask for the capture `(log_id, timestamp_ns)`.
    ///
    /// A missing entry means the archive and the file index disagree, which
    /// is fatal rather than recoverable.
    pub fn get(&mut self, log_id: &str, timestamp_ns: u64) -> Result<Vec<bool>, DataError> {
        let name = format!("{log_id}/{timestamp_ns}.feather");
        let mut bytes = Vec::new();
        match self.archive.by_name(&name) {
            Ok(mut entry) => {
                entry.read_to_end(&mut bytes)?;
            }
            Err(ZipError::FileNotFound) => {
                return Err(DataError::MaskNotFound {
                    log_id: log_id.to_string(),
                    timestamp_ns,
                    archive: self.path.clone(),
                })
            }
            Err(error) => return Err(error.into()),
        }
        let frame = read_feather_bytes(bytes)?;
        Ok(frame
            .column(MASK_COLUMN)?
            .bool()?
            .into_no_null_iter()
            .collect())
    }

    /// Number of capture entries in the archive.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Returns `true` if the archive holds no entries.
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }
}

/// Streaming writer producing a bundled per-split mask archive.
pub struct MaskArchiveWriter {
    writer: ZipWriter<File>,
}

impl MaskArchiveWriter {
    /// Create the mask archive at `path`, replacing any existing file.
    pub fn create(path: &Path) -> Result<MaskArchiveWriter, DataError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Cannot create mask archive: {}.", path.display()))?;
        Ok(MaskArchiveWriter {
            writer: ZipWriter::new(file),
        })
    }

    /// Append the mask for the capture `(log_id, timestamp_ns)`.
    pub fn add(&mut self, log_id: &str, timestamp_ns: u64, mask: &[bool]) -> Result<(), DataError> {
        let mut frame = DataFrame::new(vec![Series::new(MASK_COLUMN, mask.to_vec())])?;
        let bytes = write_feather_bytes(&mut frame)?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer
            .start_file(format!("{log_id}/{timestamp_ns}.feather"), options)?;
        self.writer.write_all(&bytes)?;
        Ok(())
    }

    /// Flush and close the archive.
    pub fn finish(self) -> Result<(), DataError> {
        self.writer.finish()?;
        Ok(())
    }
}
