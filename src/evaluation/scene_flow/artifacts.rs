//! # artifacts
//!
//! Per-capture evaluation artifact writers.
//!
//! Artifacts land at `<output_root>/<log_id>/<timestamp_ns>.feather`, one
//! file per capture. Flow components are quantized to 16-bit floats on write
//! to bound artifact size, so a rewrite of the same data is byte-identical.

use std::fs;
use std::path::{Path, PathBuf};

use half::f16;
use ndarray::{s, ArrayView2};
use polars::prelude::{DataFrame, NamedFrom};
use polars::series::Series;

use crate::errors::DataError;
use crate::evaluation::scene_flow::constants::{
    CLASSES_COLUMN, CLOSE_COLUMN, DYNAMIC_COLUMN, FLOW_COLUMNS, VALID_COLUMN,
};
use crate::io::write_feather;

/// Write one ground-truth flow artifact.
///
/// Columns: semantic class, close flag, dynamic flag, validity flag, and the
/// quantized flow components. Rewriting an existing artifact is allowed.
pub fn write_annotation_file(
    output_root: &Path,
    log_id: &str,
    timestamp_ns: u64,
    classes: &[u8],
    close: &[bool],
    dynamic: &[bool],
    valid: &[bool],
    flow: &ArrayView2<f32>,
) -> Result<PathBuf, DataError> {
    let mut frame = DataFrame::new(vec![
        Series::new(CLASSES_COLUMN, classes.to_vec()),
        Series::new(CLOSE_COLUMN, close.to_vec()),
        Series::new(DYNAMIC_COLUMN, dynamic.to_vec()),
        Series::new(VALID_COLUMN, valid.to_vec()),
    ])?;
    for series in flow_series(flow) {
        frame.with_column(series)?;
    }
    write_artifact(output_root, log_id, timestamp_ns, &mut frame)
}

/// Write one submission artifact: predicted flow plus dynamic flags.
pub fn write_submission_file(
    output_root: &Path,
    log_id: &str,
    timestamp_ns: u64,
    dynamic: &[bool],
    flow: &ArrayView2<f32>,
) -> Result<PathBuf, DataError> {
    let mut frame = DataFrame::new(flow_series(flow))?;
    frame.with_column(Series::new(DYNAMIC_COLUMN, dynamic.to_vec()))?;
    write_artifact(output_root, log_id, timestamp_ns, &mut frame)
}

/// Quantize each flow component through 16-bit floats.
fn flow_series(flow: &ArrayView2<f32>) -> Vec<Series> {
    FLOW_COLUMNS
        .iter()
        .enumerate()
        .map(|(axis, name)| {
            let quantized: Vec<f32> = flow
                .slice(s![.., axis])
                .iter()
                .map(|&value| f16::from_f32(value).to_f32())
                .collect();
            Series::new(name, quantized)
        })
        .collect()
}

/// Write `frame` under the directory-per-log, file-per-timestamp layout.
fn write_artifact(
    output_root: &Path,
    log_id: &str,
    timestamp_ns: u64,
    frame: &mut DataFrame,
) -> Result<PathBuf, DataError> {
    let log_dir = output_root.join(log_id);
    fs::create_dir_all(&log_dir)?;
    let path = log_dir.join(format!("{timestamp_ns}.feather"));
    write_feather(&path, frame)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::flow_series;
    use ndarray::array;
    use polars::prelude::TakeRandom;

    #[test]
    fn test_flow_series_quantizes_to_f16() {
        let flow = array![[1.0000001_f32, -0.30000001, 65504.], [0., 1e-8, -2.5]];
        let series = flow_series(&flow.view());
        assert_eq!(series.len(), 3);
        let x = series[0].f32().unwrap();
        // Values must already sit on the f16 grid.
        for value in x.into_no_null_iter() {
            assert_eq!(half::f16::from_f32(value).to_f32(), value);
        }
        assert_eq!(series[2].f32().unwrap().get(1).unwrap(), -2.5);
    }
}
