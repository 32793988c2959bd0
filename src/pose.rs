//! # pose
//!
//! Pose-table resolution.
//!
//! A pose table maps capture timestamps to `city_SE3_egovehicle` rigid
//! transforms. Resolution is exact-match; a missing timestamp is a
//! data-integrity error keyed by `(sequence, timestamp)`. Timestamps between
//! two table entries may be interpolated explicitly.

use std::collections::HashMap;

use glam::{DQuat, DVec3};
use ndarray::{s, Array1, ArrayView1};
use polars::lazy::dsl::{col, cols};
use polars::prelude::{DataFrame, Float64Type};

use crate::constants::POSE_COLUMNS;
use crate::errors::DataError;
use crate::geometry::se3::SE3;
use crate::geometry::so3::mat3_to_quat;
use crate::io::{ndarray_from_frame, ndarray_from_frame_filtered};

/// Resolve the rigid transform `city_SE3_egovehicle` at a timestamp.
///
/// `log_id` is carried for diagnostics only; the pose table is already
/// per-sequence.
pub fn query_pose(poses: &DataFrame, log_id: &str, timestamp_ns: u64) -> Result<SE3, DataError> {
    let pose = ndarray_from_frame_filtered::<Float64Type>(
        poses,
        cols(POSE_COLUMNS),
        col("timestamp_ns").eq(timestamp_ns),
    )?;
    if pose.shape()[0] == 0 {
        return Err(DataError::MissingPose {
            log_id: log_id.to_string(),
            timestamp_ns,
        });
    }
    Ok(se3_from_pose_row(&pose.slice(s![0, ..])))
}

/// Build an SE(3) from a single-row pose frame (translation + quaternion columns).
pub fn se3_from_pose_frame(
    city_pose: &DataFrame,
    log_id: &str,
    timestamp_ns: u64,
) -> Result<SE3, DataError> {
    let pose = ndarray_from_frame::<Float64Type>(city_pose, cols(POSE_COLUMNS))?;
    if pose.shape()[0] == 0 {
        return Err(DataError::MissingPose {
            log_id: log_id.to_string(),
            timestamp_ns,
        });
    }
    Ok(se3_from_pose_row(&pose.slice(s![0, ..])))
}

/// Interpolate the ego pose at a timestamp between two pose-table entries.
///
/// Exact hits resolve exactly; otherwise the bracketing entries are blended
/// with quaternion slerp and translation lerp. A query outside the covered
/// interval fails like a missing pose.
pub fn interpolate_pose(
    poses: &DataFrame,
    log_id: &str,
    query_timestamp_ns: u64,
) -> Result<SE3, DataError> {
    let timestamps = poses.column("timestamp_ns")?.u64()?;
    let mut lower: Option<u64> = None;
    let mut upper: Option<u64> = None;
    for timestamp_ns in timestamps.into_no_null_iter() {
        if timestamp_ns == query_timestamp_ns {
            return query_pose(poses, log_id, timestamp_ns);
        }
        if timestamp_ns < query_timestamp_ns && lower.map_or(true, |l| timestamp_ns > l) {
            lower = Some(timestamp_ns);
        }
        if timestamp_ns > query_timestamp_ns && upper.map_or(true, |u| timestamp_ns < u) {
            upper = Some(timestamp_ns);
        }
    }
    let (timestamp_ns_0, timestamp_ns_1) = match (lower, upper) {
        (Some(lower), Some(upper)) => (lower, upper),
        _ => {
            return Err(DataError::MissingPose {
                log_id: log_id.to_string(),
                timestamp_ns: query_timestamp_ns,
            })
        }
    };

    let se3_0 = query_pose(poses, log_id, timestamp_ns_0)?;
    let se3_1 = query_pose(poses, log_id, timestamp_ns_1)?;
    let fraction = (query_timestamp_ns - timestamp_ns_0) as f64
        / (timestamp_ns_1 - timestamp_ns_0) as f64;

    let quat_0 = dquat_from_wxyz(&mat3_to_quat(&se3_0.rotation.view()).view());
    let quat_1 = dquat_from_wxyz(&mat3_to_quat(&se3_1.rotation.view()).view());
    let slerp = quat_0.slerp(quat_1, fraction);

    let translation_0 = DVec3::new(se3_0.translation[0], se3_0.translation[1], se3_0.translation[2]);
    let translation_1 = DVec3::new(se3_1.translation[0], se3_1.translation[1], se3_1.translation[2]);
    let lerp = translation_0.lerp(translation_1, fraction);

    let quat_wxyz = Array1::from_vec(vec![slerp.w, slerp.x, slerp.y, slerp.z]);
    let translation = Array1::from_vec(vec![lerp.x, lerp.y, lerp.z]);
    Ok(SE3::from_quat_wxyz(&quat_wxyz.view(), translation))
}

/// Build a timestamp-keyed map over every entry of a pose table.
pub fn pose_map(poses: &DataFrame) -> Result<HashMap<u64, SE3>, DataError> {
    let timestamps = poses.column("timestamp_ns")?.u64()?;
    let pose = ndarray_from_frame::<Float64Type>(poses, cols(POSE_COLUMNS))?;
    let mut map = HashMap::with_capacity(pose.shape()[0]);
    for (row, timestamp_ns) in timestamps.into_no_null_iter().enumerate() {
        map.insert(timestamp_ns, se3_from_pose_row(&pose.slice(s![row, ..])));
    }
    Ok(map)
}

/// Build an SE(3) from one `POSE_COLUMNS`-ordered row.
fn se3_from_pose_row(pose: &ArrayView1<f64>) -> SE3 {
    let translation = pose.slice(s![..3]).as_standard_layout().to_owned();
    let quat_wxyz = pose.slice(s![3..]).as_standard_layout().to_owned();
    SE3::from_quat_wxyz(&quat_wxyz.view(), translation)
}

fn dquat_from_wxyz(quat_wxyz: &ArrayView1<f64>) -> DQuat {
    DQuat::from_xyzw(quat_wxyz[1], quat_wxyz[2], quat_wxyz[3], quat_wxyz[0])
}

#[cfg(test)]
mod tests {
    use super::{interpolate_pose, query_pose};
    use crate::errors::DataError;
    use crate::geometry::so3::{quat_to_yaw, yaw_to_quat};
    use polars::df;
    use polars::prelude::{DataFrame, NamedFrom};

    fn pose_table() -> DataFrame {
        let quat_0 = yaw_to_quat(0.0);
        let quat_1 = yaw_to_quat(std::f64::consts::FRAC_PI_2);
        df!(
            "timestamp_ns" => vec![100_u64, 200],
            "tx_m" => vec![0.0, 10.0],
            "ty_m" => vec![0.0, 0.0],
            "tz_m" => vec![0.0, 2.0],
            "qw" => vec![quat_0[0], quat_1[0]],
            "qx" => vec![quat_0[1], quat_1[1]],
            "qy" => vec![quat_0[2], quat_1[2]],
            "qz" => vec![quat_0[3], quat_1[3]],
        )
        .unwrap()
    }

    #[test]
    fn test_query_pose_exact() {
        let poses = pose_table();
        let se3 = query_pose(&poses, "log", 200).unwrap();
        assert!((se3.translation[0] - 10.0).abs() < 1e-12);
        assert!((se3.rotation[[1, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_query_pose_missing() {
        let poses = pose_table();
        let error = query_pose(&poses, "log", 150).unwrap_err();
        match error {
            DataError::MissingPose {
                log_id,
                timestamp_ns,
            } => {
                assert_eq!(log_id, "log");
                assert_eq!(timestamp_ns, 150);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_interpolate_pose_midpoint() {
        let poses = pose_table();
        let se3 = interpolate_pose(&poses, "log", 150).unwrap();
        assert!((se3.translation[0] - 5.0).abs() < 1e-9);
        assert!((se3.translation[2] - 1.0).abs() < 1e-9);
        let quat = crate::geometry::so3::mat3_to_quat(&se3.rotation.view());
        let yaw = quat_to_yaw(&quat.view());
        assert!((yaw - std::f64::consts::FRAC_PI_4).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_pose_outside_interval() {
        let poses = pose_table();
        assert!(interpolate_pose(&poses, "log", 50).is_err());
        assert!(interpolate_pose(&poses, "log", 250).is_err());
    }
}
