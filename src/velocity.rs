//! # velocity
//!
//! Per-annotation velocity estimation.
//!
//! Annotated cuboids carry no velocity on disk. We estimate one per
//! observation by chaining each track's centers through the city frame and
//! averaging finite differences over a short causal window. Tracks observed
//! fewer than twice in the window yield no estimate.

use ndarray::{s, Array2};
use polars::lazy::dsl::cols;
use polars::prelude::{DataFrame, Float64Type, NamedFrom, Series};

use crate::constants::{TRANSLATION_COLUMNS, VELOCITY_COLUMNS};
use crate::errors::DataError;
use crate::io::ndarray_from_frame;
use crate::pose::pose_map;

/// Number of track observations considered per estimate (the observation
/// itself plus its predecessors).
const VELOCITY_WINDOW: usize = 3;

/// Estimate a city-frame velocity for every annotation row.
///
/// Rows are grouped by `track_uuid` and ordered by `timestamp_ns` internally;
/// the returned frame preserves the input row order and appends
/// [`VELOCITY_COLUMNS`], null where a track has no preceding observation in
/// its window.
pub fn populate_annotation_velocities(
    annotations: &DataFrame,
    poses: &DataFrame,
    log_id: &str,
) -> Result<DataFrame, DataError> {
    let num_rows = annotations.height();
    let track_uuids = annotations.column("track_uuid")?.utf8()?;
    let timestamps = annotations.column("timestamp_ns")?.u64()?;
    let keys: Vec<(&str, u64)> = track_uuids
        .into_no_null_iter()
        .zip(timestamps.into_no_null_iter())
        .collect();

    let mut order: Vec<usize> = (0..num_rows).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

    let city_centers = city_frame_centers(annotations, poses, log_id, &keys)?;

    let mut velocities: Vec<Option<[f64; 3]>> = vec![None; num_rows];
    let mut start = 0;
    while start < num_rows {
        let mut end = start + 1;
        while end < num_rows && keys[order[end]].0 == keys[order[start]].0 {
            end += 1;
        }
        for i in start..end {
            let window_start = i.saturating_sub(VELOCITY_WINDOW - 1).max(start);
            if i == window_start {
                continue;
            }
            let mut mean = [0.0_f64; 3];
            for j in window_start..i {
                let row_a = order[j];
                let row_b = order[j + 1];
                let seconds = (keys[row_b].1 - keys[row_a].1) as f64 * 1e-9;
                for axis in 0..3 {
                    mean[axis] +=
                        (city_centers[[row_b, axis]] - city_centers[[row_a, axis]]) / seconds;
                }
            }
            let num_diffs = (i - window_start) as f64;
            for component in &mut mean {
                *component /= num_diffs;
            }
            velocities[order[i]] = Some(mean);
        }
        start = end;
    }

    let columns: Vec<Series> = VELOCITY_COLUMNS
        .iter()
        .enumerate()
        .map(|(axis, name)| {
            let values: Vec<Option<f64>> = velocities
                .iter()
                .map(|velocity| velocity.map(|velocity| velocity[axis]))
                .collect();
            Series::new(name, values)
        })
        .collect();
    Ok(annotations.hstack(&columns)?)
}

/// Map every annotation center into the city frame via its capture pose.
fn city_frame_centers(
    annotations: &DataFrame,
    poses: &DataFrame,
    log_id: &str,
    keys: &[(&str, u64)],
) -> Result<Array2<f64>, DataError> {
    let centers = ndarray_from_frame::<Float64Type>(annotations, cols(TRANSLATION_COLUMNS))?;
    let city_se3_ego = pose_map(poses)?;
    let mut city_centers = Array2::<f64>::zeros(centers.raw_dim());
    for (row, &(_, timestamp_ns)) in keys.iter().enumerate() {
        let pose = city_se3_ego
            .get(&timestamp_ns)
            .ok_or_else(|| DataError::MissingPose {
                log_id: log_id.to_string(),
                timestamp_ns,
            })?;
        let city_center = pose.transform_from(&centers.slice(s![row..row + 1, ..]));
        city_centers
            .slice_mut(s![row..row + 1, ..])
            .assign(&city_center);
    }
    Ok(city_centers)
}
