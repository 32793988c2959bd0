//! # flow
//!
//! Ground-truth scene-flow derivation.
//!
//! Flow for a sweep pair starts from the rigid field induced by ego motion;
//! points interior to an annotated cuboid whose track survives into the next
//! capture are instead displaced by that object's own motion, and points
//! whose track vanishes are flagged invalid. A point is dynamic when its flow
//! departs from the rigid field by at least the benchmark threshold.

use std::collections::HashMap;

use ndarray::{s, Array2};
use polars::lazy::dsl::cols;
use polars::prelude::{DataFrame, Float64Type};

use crate::constants::{CUBOID_COLUMNS, XYZ_COLUMNS};
use crate::errors::DataError;
use crate::evaluation::scene_flow::constants::{
    category_to_class_id, BOUNDING_BOX_EXPANSION_M, SCENE_FLOW_DYNAMIC_THRESHOLD_M,
};
use crate::evaluation::scene_flow::SweepPair;
use crate::geometry::polytope::cuboid_interior_mask;
use crate::geometry::se3::SE3;
use crate::io::ndarray_from_frame;

/// Per-point ground-truth flow for one sweep pair.
#[derive(Clone, Debug)]
pub struct Flow {
    /// Flow vectors, one row per query-sweep point.
    pub flow: Array2<f32>,
    /// False where the point's track vanishes at the next capture.
    pub valid: Vec<bool>,
    /// Semantic class ids (background = 0).
    pub classes: Vec<u8>,
    /// True where the point moves relative to the rigid ego-motion field.
    pub dynamic: Vec<bool>,
}

impl Flow {
    /// Derive the ground-truth flow for an annotated sweep pair.
    ///
    /// Fails when the pair has no next sweep (log boundary) or either capture
    /// lacks annotations.
    pub fn from_sweep_pair(pair: &SweepPair) -> Result<Flow, DataError> {
        let (log_id, timestamp_ns) = &pair.sweep.sweep_uuid;
        let missing = || DataError::MissingFlowAnnotations {
            log_id: log_id.clone(),
            timestamp_ns: *timestamp_ns,
        };
        let next_sweep = pair.next_sweep.as_ref().ok_or_else(missing)?;
        let ego_motion = pair.ego_motion.as_ref().ok_or_else(missing)?;
        let annotations = pair.sweep.annotations.as_ref().ok_or_else(missing)?;
        let next_annotations = next_sweep.annotations.as_ref().ok_or_else(missing)?;

        let xyz = ndarray_from_frame::<Float64Type>(&pair.sweep.lidar, cols(XYZ_COLUMNS))?;
        let num_points = xyz.shape()[0];
        let rigid_flow = ego_motion.transform_from(&xyz.view()) - &xyz;
        let mut flow = rigid_flow.clone();
        let mut valid = vec![true; num_points];
        let mut classes = vec![0_u8; num_points];

        let cuboids = ndarray_from_frame::<Float64Type>(annotations, cols(CUBOID_COLUMNS))?;
        let next_cuboids = ndarray_from_frame::<Float64Type>(next_annotations, cols(CUBOID_COLUMNS))?;
        let next_rows: HashMap<&str, usize> = track_uuids(next_annotations)?
            .into_iter()
            .enumerate()
            .map(|(row, track_uuid)| (track_uuid, row))
            .collect();

        let categories = annotations.column("category")?.utf8()?;
        for (row, (track_uuid, category)) in track_uuids(annotations)?
            .into_iter()
            .zip(categories.into_no_null_iter())
            .enumerate()
        {
            let cuboid = cuboids.slice(s![row, ..]);
            let ego_se3_object = SE3::from_quat_wxyz(
                &cuboid.slice(s![6..]),
                cuboid.slice(s![..3]).to_owned(),
            );
            let mut dims_lwh = cuboid.slice(s![3..6]).to_owned();
            dims_lwh[0] += BOUNDING_BOX_EXPANSION_M;
            dims_lwh[1] += BOUNDING_BOX_EXPANSION_M;

            let interior = cuboid_interior_mask(&xyz.view(), &ego_se3_object, &dims_lwh.view());
            let interior_indices: Vec<usize> = interior
                .iter()
                .enumerate()
                .filter_map(|(point, &inside)| inside.then_some(point))
                .collect();
            if interior_indices.is_empty() {
                continue;
            }

            let class_id = category_to_class_id(category);
            for &point in &interior_indices {
                classes[point] = class_id;
            }

            match next_rows.get(track_uuid) {
                Some(&next_row) => {
                    let next_cuboid = next_cuboids.slice(s![next_row, ..]);
                    let next_ego_se3_object = SE3::from_quat_wxyz(
                        &next_cuboid.slice(s![6..]),
                        next_cuboid.slice(s![..3]).to_owned(),
                    );
                    let object_motion = next_ego_se3_object.compose(&ego_se3_object.inverse());

                    let mut object_points =
                        Array2::<f64>::zeros((interior_indices.len(), 3));
                    for (k, &point) in interior_indices.iter().enumerate() {
                        object_points.row_mut(k).assign(&xyz.row(point));
                    }
                    let displaced = object_motion.transform_from(&object_points.view());
                    for (k, &point) in interior_indices.iter().enumerate() {
                        for axis in 0..3 {
                            flow[[point, axis]] =
                                displaced[[k, axis]] - object_points[[k, axis]];
                        }
                    }
                }
                None => {
                    for &point in &interior_indices {
                        valid[point] = false;
                    }
                }
            }
        }

        let dynamic: Vec<bool> = (0..num_points)
            .map(|point| {
                let mut norm_squared = 0.;
                for axis in 0..3 {
                    let delta = flow[[point, axis]] - rigid_flow[[point, axis]];
                    norm_squared += delta * delta;
                }
                norm_squared.sqrt() >= SCENE_FLOW_DYNAMIC_THRESHOLD_M
            })
            .collect();

        Ok(Flow {
            flow: flow.mapv(|value| value as f32),
            valid,
            classes,
            dynamic,
        })
    }

    /// Restrict the flow to the points flagged by `mask`.
    pub fn masked(&self, mask: &[bool]) -> Flow {
        let kept: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(point, &keep)| keep.then_some(point))
            .collect();
        let mut flow = Array2::<f32>::zeros((kept.len(), 3));
        for (k, &point) in kept.iter().enumerate() {
            flow.row_mut(k).assign(&self.flow.row(point));
        }
        Flow {
            flow,
            valid: kept.iter().map(|&point| self.valid[point]).collect(),
            classes: kept.iter().map(|&point| self.classes[point]).collect(),
            dynamic: kept.iter().map(|&point| self.dynamic[point]).collect(),
        }
    }
}

/// Track identifiers of an annotation frame, in row order.
fn track_uuids(annotations: &DataFrame) -> Result<Vec<&str>, DataError> {
    Ok(annotations
        .column("track_uuid")?
        .utf8()?
        .into_no_null_iter()
        .collect())
}
