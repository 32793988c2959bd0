//! Shared on-disk fixtures: synthetic split trees with lidar, pose, and
//! annotation feather files.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use polars::df;
use polars::prelude::{DataFrame, NamedFrom, Series};

use sweepflow::constants::GROUND_COLUMN;
use sweepflow::geometry::so3::yaw_to_quat;
use sweepflow::io::write_feather;

/// One annotated cuboid observation.
pub struct CuboidRow {
    pub timestamp_ns: u64,
    pub track_uuid: &'static str,
    pub category: &'static str,
    pub center: [f64; 3],
    pub dims_lwh: [f64; 3],
    pub yaw: f64,
    pub num_interior_pts: u64,
}

/// Create `<root>/<dataset_name>/<split_name>/<log_id>` with its sensor
/// subdirectories and return the log directory.
pub fn create_log_dir(root: &Path, dataset_name: &str, split_name: &str, log_id: &str) -> PathBuf {
    let log_dir = root.join(dataset_name).join(split_name).join(log_id);
    fs::create_dir_all(log_dir.join("sensors").join("lidar")).unwrap();
    log_dir
}

/// Write a lidar capture with the given points.
pub fn write_lidar(log_dir: &Path, timestamp_ns: u64, points: &[[f32; 3]]) {
    let frame = lidar_frame(points);
    write_lidar_frame(log_dir, timestamp_ns, frame);
}

/// Write a lidar capture carrying per-point ground labels.
pub fn write_lidar_with_ground(
    log_dir: &Path,
    timestamp_ns: u64,
    points: &[[f32; 3]],
    is_ground: &[bool],
) {
    let mut frame = lidar_frame(points);
    frame
        .with_column(Series::new(GROUND_COLUMN, is_ground.to_vec()))
        .unwrap();
    write_lidar_frame(log_dir, timestamp_ns, frame);
}

/// Write the ego-pose table as `(timestamp_ns, translation, yaw)` rows.
pub fn write_poses(log_dir: &Path, rows: &[(u64, [f64; 3], f64)]) {
    let quats: Vec<Array1<f64>> = rows.iter().map(|&(_, _, yaw)| yaw_to_quat(yaw)).collect();
    let mut frame = df!(
        "timestamp_ns" => rows.iter().map(|row| row.0).collect::<Vec<u64>>(),
        "qw" => quats.iter().map(|quat| quat[0]).collect::<Vec<f64>>(),
        "qx" => quats.iter().map(|quat| quat[1]).collect::<Vec<f64>>(),
        "qy" => quats.iter().map(|quat| quat[2]).collect::<Vec<f64>>(),
        "qz" => quats.iter().map(|quat| quat[3]).collect::<Vec<f64>>(),
        "tx_m" => rows.iter().map(|row| row.1[0]).collect::<Vec<f64>>(),
        "ty_m" => rows.iter().map(|row| row.1[1]).collect::<Vec<f64>>(),
        "tz_m" => rows.iter().map(|row| row.1[2]).collect::<Vec<f64>>(),
    )
    .unwrap();
    write_feather(&log_dir.join("city_SE3_egovehicle.feather"), &mut frame).unwrap();
}

/// Write the per-log annotations table.
pub fn write_annotations(log_dir: &Path, rows: &[CuboidRow]) {
    let quats: Vec<Array1<f64>> = rows.iter().map(|row| yaw_to_quat(row.yaw)).collect();
    let mut frame = df!(
        "timestamp_ns" => rows.iter().map(|row| row.timestamp_ns).collect::<Vec<u64>>(),
        "track_uuid" => rows.iter().map(|row| row.track_uuid).collect::<Vec<&str>>(),
        "category" => rows.iter().map(|row| row.category).collect::<Vec<&str>>(),
        "tx_m" => rows.iter().map(|row| row.center[0]).collect::<Vec<f64>>(),
        "ty_m" => rows.iter().map(|row| row.center[1]).collect::<Vec<f64>>(),
        "tz_m" => rows.iter().map(|row| row.center[2]).collect::<Vec<f64>>(),
        "length_m" => rows.iter().map(|row| row.dims_lwh[0]).collect::<Vec<f64>>(),
        "width_m" => rows.iter().map(|row| row.dims_lwh[1]).collect::<Vec<f64>>(),
        "height_m" => rows.iter().map(|row| row.dims_lwh[2]).collect::<Vec<f64>>(),
        "qw" => quats.iter().map(|quat| quat[0]).collect::<Vec<f64>>(),
        "qx" => quats.iter().map(|quat| quat[1]).collect::<Vec<f64>>(),
        "qy" => quats.iter().map(|quat| quat[2]).collect::<Vec<f64>>(),
        "qz" => quats.iter().map(|quat| quat[3]).collect::<Vec<f64>>(),
        "num_interior_pts" => rows.iter().map(|row| row.num_interior_pts).collect::<Vec<u64>>(),
    )
    .unwrap();
    write_feather(&log_dir.join("annotations.feather"), &mut frame).unwrap();
}

/// Column contents as a `Vec<f32>`.
pub fn f32_column(frame: &DataFrame, name: &str) -> Vec<f32> {
    frame
        .column(name)
        .unwrap()
        .f32()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

/// Column contents as a `Vec<u64>`.
pub fn u64_column(frame: &DataFrame, name: &str) -> Vec<u64> {
    frame
        .column(name)
        .unwrap()
        .u64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn lidar_frame(points: &[[f32; 3]]) -> DataFrame {
    df!(
        "x" => points.iter().map(|point| point[0]).collect::<Vec<f32>>(),
        "y" => points.iter().map(|point| point[1]).collect::<Vec<f32>>(),
        "z" => points.iter().map(|point| point[2]).collect::<Vec<f32>>(),
    )
    .unwrap()
}

fn write_lidar_frame(log_dir: &Path, timestamp_ns: u64, mut frame: DataFrame) {
    let path = log_dir
        .join("sensors")
        .join("lidar")
        .join(format!("{timestamp_ns}.feather"));
    write_feather(&path, &mut frame).unwrap();
}
