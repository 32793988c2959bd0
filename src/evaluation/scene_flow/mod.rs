//! # scene_flow
//!
//! Scene-flow evaluation: sweep-pair loading, ground-truth flow, evaluation
//! masks, and artifact generation.

pub mod artifacts;
pub mod constants;
pub mod flow;
pub mod masks;

use crate::data_loader::{DataLoader, FileCachingMode, Sweep};
use crate::errors::DataError;
use crate::geometry::se3::SE3;
use crate::pose::se3_from_pose_frame;

use self::constants::EVAL_SUBSET_STRIDE;

/// A sweep paired with its successor in the same log.
#[derive(Clone, Debug)]
pub struct SweepPair {
    /// Query sweep.
    pub sweep: Sweep,
    /// Next sweep of the same log; absent at the log boundary.
    pub next_sweep: Option<Sweep>,
    /// Relative ego motion `ego_t1_SE3_ego_t0`; present iff `next_sweep` is.
    pub ego_motion: Option<SE3>,
}

/// Data-loader yielding consecutive sweep pairs for scene-flow evaluation.
pub struct SceneFlowDataLoader {
    /// Underlying single-sweep loader.
    pub data_loader: DataLoader,
}

impl SceneFlowDataLoader {
    /// Initialize the loader for a split.
    ///
    /// Scene flow is defined between raw consecutive captures, so the inner
    /// loader never accumulates.
    pub fn new(
        root_dir: &str,
        dataset_name: &str,
        split_name: &str,
        memory_mapped: bool,
        file_caching_mode: FileCachingMode,
    ) -> Result<SceneFlowDataLoader, DataError> {
        let data_loader = DataLoader::new(
            root_dir,
            dataset_name,
            split_name,
            1,
            memory_mapped,
            file_caching_mode,
        )?;
        Ok(SceneFlowDataLoader { data_loader })
    }

    /// Return the number of sweep pairs (one per capture).
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.data_loader.len()
    }

    /// Returns `true` if the file index is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data_loader.is_empty()
    }

    /// Get the sweep pair at `index`.
    ///
    /// The successor sweep and relative ego motion are populated only when
    /// the capture at `index + 1` belongs to the same log.
    pub fn get(&self, index: usize) -> Result<SweepPair, DataError> {
        let sweep = self.data_loader.get(index)?;
        let next_sweep = match index + 1 < self.data_loader.len() {
            true => {
                let (next_log_id, _) = self.data_loader.sweep_uuid(index + 1)?;
                match next_log_id == sweep.sweep_uuid.0 {
                    true => Some(self.data_loader.get(index + 1)?),
                    false => None,
                }
            }
            false => None,
        };
        match next_sweep {
            Some(next_sweep) => {
                let city_se3_ego_t0 = se3_from_pose_frame(
                    &sweep.city_pose,
                    &sweep.sweep_uuid.0,
                    sweep.sweep_uuid.1,
                )?;
                let city_se3_ego_t1 = se3_from_pose_frame(
                    &next_sweep.city_pose,
                    &next_sweep.sweep_uuid.0,
                    next_sweep.sweep_uuid.1,
                )?;
                let ego_motion = city_se3_ego_t1.inverse().compose(&city_se3_ego_t0);
                Ok(SweepPair {
                    sweep,
                    next_sweep: Some(next_sweep),
                    ego_motion: Some(ego_motion),
                })
            }
            None => Ok(SweepPair {
                sweep,
                next_sweep: None,
                ego_motion: None,
            }),
        }
    }
}

impl Iterator for SceneFlowDataLoader {
    type Item = Result<SweepPair, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data_loader.current_index >= self.data_loader.len() {
            return None;
        }
        let pair = self.get(self.data_loader.current_index);
        self.data_loader.current_index += 1;
        Some(pair)
    }
}

/// Capture indices evaluated by the benchmark: every
/// [`EVAL_SUBSET_STRIDE`]-th index of the split, starting at zero.
pub fn get_eval_subset(data_loader: &SceneFlowDataLoader) -> Vec<usize> {
    (0..data_loader.len()).step_by(EVAL_SUBSET_STRIDE).collect()
}
