//! # polytope
//!
//! Geometric algorithms for cuboid geometries.

use ndarray::{ArrayView1, ArrayView2};

use super::se3::SE3;

/// Compute a boolean mask indicating which points are interior to the cuboid.
///
/// `points` are expressed in the same frame as `pose_se3_object` maps from,
/// e.g. ego-frame points with an ego→object cuboid pose. Boundary points
/// count as interior.
pub fn cuboid_interior_mask(
    points: &ArrayView2<f64>,
    pose_se3_object: &SE3,
    dims_lwh: &ArrayView1<f64>,
) -> Vec<bool> {
    let object_se3_pose = pose_se3_object.inverse();
    let points_object = object_se3_pose.transform_from(points);
    let half_length = dims_lwh[0] / 2.;
    let half_width = dims_lwh[1] / 2.;
    let half_height = dims_lwh[2] / 2.;
    points_object
        .outer_iter()
        .map(|point| {
            point[0].abs() <= half_length
                && point[1].abs() <= half_width
                && point[2].abs() <= half_height
        })
        .collect()
}
