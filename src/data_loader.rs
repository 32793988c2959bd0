//! # data_loader
//!
//! Data-loader for assembling ego-motion-compensated lidar sweeps.
//!
//! The loader walks a split directory once to build a `(log_id, timestamp_ns)`
//! file index, then serves random-access reads of accumulated sweeps, pose
//! rows, and velocity-annotated cuboids. Derived frames can be cached on disk
//! behind an exclusive-lock helper so concurrent processes populate each cache
//! entry exactly once.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use glob::glob;
use itertools::Itertools;
use log::info;
use once_cell::sync::Lazy;
use polars::lazy::dsl::{col, cols, Expr};
use polars::prelude::{
    BooleanChunked, DataFrame, Float32Type, IntoLazy, NamedFrom, TakeRandom, UInt32Chunked,
};
use polars::series::Series;
use polars::{self, df};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

use crate::constants::{
    ANNOTATION_COLUMNS, DISTANCE_COLUMN, POSE_COLUMNS, TIMEDELTA_COLUMN, TRANSLATION_COLUMNS,
    VELOCITY_COLUMNS, XYZ_COLUMNS,
};
use crate::errors::DataError;
use crate::io::{cached_frame, ndarray_from_frame, read_feather, read_timestamped_feather};
use crate::path::{extract_file_stem, parse_timestamp_ns, walk_dir};
use crate::pose::query_pose;
use crate::share::ndarray_to_series_vec;
use crate::velocity::populate_annotation_velocities;

const MIN_NUM_LIDAR_PTS: u64 = 1;

/// Default root for the on-disk cache of derived frames.
static DEFAULT_CACHE_DIR: Lazy<PathBuf> = Lazy::new(|| env::temp_dir().join("sweepflow"));

/// Modes for caching loader-derived frames on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileCachingMode {
    /// Cache derived frames beneath the given root, one subtree per split.
    Disk(PathBuf),
    /// Recompute derived frames on every read.
    Off,
}

impl Default for FileCachingMode {
    /// Disk caching under the system temporary directory.
    fn default() -> Self {
        FileCachingMode::Disk(DEFAULT_CACHE_DIR.clone())
    }
}

impl FileCachingMode {
    /// Cache destination for a split-relative entry, if caching is enabled.
    fn cache_path(&self, dataset_name: &str, split_name: &str, relative: &Path) -> Option<PathBuf> {
        match self {
            FileCachingMode::Disk(cache_dir) => {
                Some(cache_dir.join(dataset_name).join(split_name).join(relative))
            }
            FileCachingMode::Off => None,
        }
    }
}

/// Data associated with a single lidar sweep.
#[derive(Clone, Debug)]
pub struct Sweep {
    /// Ground truth annotations.
    pub annotations: Option<DataFrame>,
    /// Ego-vehicle city pose.
    pub city_pose: DataFrame,
    /// Point cloud associated with the sweep.
    pub lidar: DataFrame,
    /// Log id and nanosecond timestamp (unique identifier).
    pub sweep_uuid: (String, u64),
}

/// Sensor data-loader for accumulated lidar sweeps.
pub struct DataLoader {
    /// Root dataset directory.
    pub root_dir: PathBuf,
    /// Dataset name (e.g., `av2`).
    pub dataset_name: String,
    /// Root dataset split name (e.g., `val`).
    pub split_name: String,
    /// Number of accumulated lidar sweeps.
    pub num_accumulated_sweeps: usize,
    /// Boolean flag to enable memory-mapped data-frame loading.
    pub memory_mapped: bool,
    /// Caching mode for derived frames.
    pub file_caching_mode: FileCachingMode,
    /// Minimum point range kept in an accumulated sweep. Defaults to `0.`.
    pub min_lidar_range_m: f32,
    /// Maximum point range kept in an accumulated sweep. Defaults to infinity.
    pub max_lidar_range_m: f32,
    /// Minimum cuboid center range kept by annotation reads. Defaults to `0.`.
    pub min_annotation_range_m: f32,
    /// Maximum cuboid center range kept by annotation reads. Defaults to infinity.
    pub max_annotation_range_m: f32,
    /// Minimum interior point count kept by annotation reads. Defaults to `1`.
    pub min_interior_pts: u64,
    /// Data-frame consisting of `log_id` and `timestamp_ns`.
    pub file_index: DataFrame,
    /// Current index of the data-loader.
    pub current_index: usize,
}

impl DataLoader {
    /// Initialize the data-loader and build the file index.
    pub fn new(
        root_dir: &str,
        dataset_name: &str,
        split_name: &str,
        num_accumulated_sweeps: usize,
        memory_mapped: bool,
        file_caching_mode: FileCachingMode,
    ) -> Result<DataLoader, DataError> {
        let root_dir = Path::new(root_dir).to_path_buf();
        let split_dir = root_dir.join(dataset_name).join(split_name);
        let file_index = match file_caching_mode.cache_path(
            dataset_name,
            split_name,
            Path::new("file_index.feather"),
        ) {
            Some(cache_path) => {
                cached_frame(&cache_path, memory_mapped, || build_file_index(&split_dir))?
            }
            None => build_file_index(&split_dir)?,
        };
        info!(
            "Initialized the data loader: split_dir={}, num_accumulated_sweeps={num_accumulated_sweeps}, {} captures.",
            split_dir.display(),
            file_index.shape().0,
        );
        Ok(DataLoader {
            root_dir,
            dataset_name: dataset_name.to_string(),
            split_name: split_name.to_string(),
            num_accumulated_sweeps,
            memory_mapped,
            file_caching_mode,
            min_lidar_range_m: 0.,
            max_lidar_range_m: f32::INFINITY,
            min_annotation_range_m: 0.,
            max_annotation_range_m: f32::INFINITY,
            min_interior_pts: MIN_NUM_LIDAR_PTS,
            file_index,
            current_index: 0,
        })
    }

    /// Return the data loader length.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.file_index.shape().0
    }

    /// Returns `true` if the file index is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Log split directory.
    /// E.g., `<root_dir>/<dataset_name>/<split_name>`.
    pub fn split_dir(&self) -> PathBuf {
        self.root_dir
            .join(&self.dataset_name)
            .join(&self.split_name)
    }

    /// Log directory.
    /// E.g., `<split_dir>/<log_id>`.
    pub fn log_dir(&self, log_id: &str) -> PathBuf {
        self.split_dir().join(log_id)
    }

    /// Lidar path for `log_id` captured at `timestamp_ns`.
    /// E.g., `<log_dir>/sensors/lidar/<timestamp_ns>.feather`.
    pub fn lidar_path(&self, log_id: &str, timestamp_ns: u64) -> PathBuf {
        let file_name = format!("{timestamp_ns}.feather");
        let lidar_path = [
            self.log_dir(log_id),
            "sensors".to_string().into(),
            "lidar".to_string().into(),
            file_name.into(),
        ]
        .iter()
        .collect();
        lidar_path
    }

    /// Annotations path associated with `log_id`.
    /// This includes annotations for _every_ sweep in the log.
    /// E.g., `<log_dir>/annotations.feather`.
    pub fn annotations_path(&self, log_id: &str) -> PathBuf {
        self.log_dir(log_id).join("annotations.feather")
    }

    /// City pose path associated with `log_id`.
    /// This includes the egovehicle pose for _every_ sweep in the log.
    /// E.g., `<log_dir>/city_SE3_egovehicle.feather`.
    pub fn city_pose_path(&self, log_id: &str) -> PathBuf {
        self.log_dir(log_id).join("city_SE3_egovehicle.feather")
    }

    /// Resolve the `(log_id, timestamp_ns)` capture key at `index`.
    pub fn sweep_uuid(&self, index: usize) -> Result<(String, u64), DataError> {
        let log_ids = self.file_index.column("log_id")?.utf8()?;
        let timestamps = self.file_index.column("timestamp_ns")?.u64()?;
        match (log_ids.get(index), timestamps.get(index)) {
            (Some(log_id), Some(timestamp_ns)) => Ok((log_id.to_string(), timestamp_ns)),
            _ => Err(DataError::IndexOutOfBounds {
                index,
                len: self.len(),
            }),
        }
    }

    /// Get the sweep at `index`.
    pub fn get(&self, index: usize) -> Result<Sweep, DataError> {
        let (log_id, timestamp_ns) = self.sweep_uuid(index)?;

        // Annotations aren't available for the test set.
        let annotations = match self.split_name.as_str() {
            "test" => None,
            _ => Some(self.read_annotations(&log_id, timestamp_ns)?),
        };

        let city_pose = self.read_city_pose(&log_id, timestamp_ns)?;
        let lidar = self.read_lidar(&log_id, timestamp_ns, index)?;

        Ok(Sweep {
            annotations,
            city_pose,
            lidar,
            sweep_uuid: (log_id, timestamp_ns),
        })
    }

    /// Read city egovehicle pose occurring at `timestamp_ns`.
    pub fn read_city_pose(&self, log_id: &str, timestamp_ns: u64) -> Result<DataFrame, DataError> {
        let frame = read_timestamped_feather(
            &self.city_pose_path(log_id),
            &POSE_COLUMNS.to_vec(),
            timestamp_ns,
            self.memory_mapped,
        )?
        .collect()?;
        match frame.shape().0 {
            0 => Err(DataError::MissingPose {
                log_id: log_id.to_string(),
                timestamp_ns,
            }),
            _ => Ok(frame),
        }
    }

    /// Read and accumulate the lidar window ending at `index`.
    ///
    /// Accumulation only occurs if `num_accumulated_sweeps` > 1; the window
    /// truncates at the start of the log rather than crossing into another
    /// one. Older sweeps are motion-compensated into the frame of the capture
    /// at `timestamp_ns`, and each point is tagged with its age. The merged
    /// sweep is range-filtered and sorted by `(timedelta_ns, distance)`, so
    /// the capture's own points always come first.
    pub fn read_lidar(
        &self,
        log_id: &str,
        timestamp_ns: u64,
        index: usize,
    ) -> Result<DataFrame, DataError> {
        let start_index =
            i64::max(index as i64 - self.num_accumulated_sweeps as i64 + 1, 0) as usize;
        let log_ids = self.file_index.column("log_id")?.utf8()?;
        let timestamps = self.file_index.column("timestamp_ns")?.u64()?;

        // Window timestamps, newest first, truncated at the log boundary.
        let mut window = Vec::with_capacity(self.num_accumulated_sweeps);
        for i in (start_index..=index).rev() {
            match (log_ids.get(i), timestamps.get(i)) {
                (Some(log_id_i), Some(timestamp_ns_i)) if log_id_i == log_id => {
                    window.push(timestamp_ns_i);
                }
                _ => break,
            }
        }
        if window.is_empty() {
            return Err(DataError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }

        // A window of one never touches the pose table.
        let pose_context = match window.len() {
            1 => None,
            _ => {
                let poses = self.read_pose_table(log_id)?;
                let ego_ref_se3_city = query_pose(&poses, log_id, timestamp_ns)?.inverse();
                Some((poses, ego_ref_se3_city))
            }
        };

        let mut sweep: Option<DataFrame> = None;
        for &timestamp_ns_k in &window {
            let mut lidar = self.read_raw_lidar(log_id, timestamp_ns_k)?;
            let num_points = lidar.shape().0;
            if let Some((poses, ego_ref_se3_city)) = &pose_context {
                if timestamp_ns_k != timestamp_ns {
                    let xyz = ndarray_from_frame::<Float32Type>(&lidar, cols(XYZ_COLUMNS))?
                        .mapv(f64::from);
                    let city_se3_ego_k = query_pose(poses, log_id, timestamp_ns_k)?;
                    let ego_ref_se3_ego_k = ego_ref_se3_city.compose(&city_se3_ego_k);
                    let xyz_ref = ego_ref_se3_ego_k
                        .transform_from(&xyz.view())
                        .mapv(|value| value as f32);
                    for series in ndarray_to_series_vec(&xyz_ref.view(), &XYZ_COLUMNS) {
                        lidar.with_column(series)?;
                    }
                }
            }
            let timedeltas = vec![timestamp_ns - timestamp_ns_k; num_points];
            lidar.with_column(Series::new(TIMEDELTA_COLUMN, timedeltas))?;
            sweep = Some(match sweep {
                Some(frame) => frame.vstack(&lidar)?,
                None => lidar,
            });
        }
        match sweep {
            Some(frame) => self.post_process_sweep(frame),
            None => Err(DataError::IndexOutOfBounds {
                index,
                len: self.len(),
            }),
        }
    }

    /// Read the annotations in `log_id` occurring at `timestamp_ns`.
    ///
    /// Cuboids are filtered to at least [`DataLoader::min_interior_pts`]
    /// interior points and to centers within the annotation range bounds; each
    /// row carries its estimated city-frame velocity and center range.
    pub fn read_annotations(
        &self,
        log_id: &str,
        timestamp_ns: u64,
    ) -> Result<DataFrame, DataError> {
        let annotations = self.annotations_with_velocities(log_id)?;
        let mut frame = annotations
            .lazy()
            .filter(col("timestamp_ns").eq(timestamp_ns))
            .filter(col("num_interior_pts").gt_eq(self.min_interior_pts))
            .select(&[cols(ANNOTATION_COLUMNS), cols(VELOCITY_COLUMNS)])
            .collect()?;
        let ranges = point_ranges(&frame, cols(TRANSLATION_COLUMNS))?;
        frame.with_column(Series::new(DISTANCE_COLUMN, ranges.clone()))?;
        let keep: BooleanChunked = ranges
            .iter()
            .map(|&range| {
                range >= self.min_annotation_range_m && range <= self.max_annotation_range_m
            })
            .collect();
        Ok(frame.filter(&keep)?)
    }

    /// Per-log pose table, cached when caching is enabled.
    fn read_pose_table(&self, log_id: &str) -> Result<DataFrame, DataError> {
        self.cached_or(Path::new(log_id).join("city_SE3_egovehicle.feather"), || {
            read_feather(&self.city_pose_path(log_id), self.memory_mapped)
        })
    }

    /// Raw per-capture lidar frame, cached when caching is enabled.
    fn read_raw_lidar(&self, log_id: &str, timestamp_ns: u64) -> Result<DataFrame, DataError> {
        self.cached_or(
            Path::new(log_id)
                .join("sensors")
                .join("lidar")
                .join(format!("{timestamp_ns}.feather")),
            || read_feather(&self.lidar_path(log_id, timestamp_ns), self.memory_mapped),
        )
    }

    /// Per-log annotations with estimated velocities, cached when caching is
    /// enabled so the estimator runs once per log.
    fn annotations_with_velocities(&self, log_id: &str) -> Result<DataFrame, DataError> {
        self.cached_or(Path::new(log_id).join("annotations.feather"), || {
            let annotations = read_feather(&self.annotations_path(log_id), self.memory_mapped)?;
            let poses = self.read_pose_table(log_id)?;
            populate_annotation_velocities(&annotations, &poses, log_id)
        })
    }

    /// Tag the sweep with point ranges, apply the range bounds, and order by
    /// `(timedelta_ns, distance)` ascending.
    fn post_process_sweep(&self, mut frame: DataFrame) -> Result<DataFrame, DataError> {
        let ranges = point_ranges(&frame, cols(XYZ_COLUMNS))?;
        frame.with_column(Series::new(DISTANCE_COLUMN, ranges.clone()))?;
        let keep: BooleanChunked = ranges
            .iter()
            .map(|&range| range >= self.min_lidar_range_m && range <= self.max_lidar_range_m)
            .collect();
        let frame = frame.filter(&keep)?;

        let timedeltas: Vec<u64> = frame
            .column(TIMEDELTA_COLUMN)?
            .u64()?
            .into_no_null_iter()
            .collect();
        let ranges: Vec<f32> = frame
            .column(DISTANCE_COLUMN)?
            .f32()?
            .into_no_null_iter()
            .collect();
        let mut order: Vec<u32> = (0..frame.shape().0 as u32).collect();
        order.sort_by(|&a, &b| {
            let (a, b) = (a as usize, b as usize);
            timedeltas[a]
                .cmp(&timedeltas[b])
                .then(ranges[a].total_cmp(&ranges[b]))
        });
        Ok(frame.take(&UInt32Chunked::from_vec("order", order))?)
    }

    /// Run `produce` through the disk cache at `relative`, or directly when
    /// caching is disabled.
    fn cached_or<F>(&self, relative: PathBuf, produce: F) -> Result<DataFrame, DataError>
    where
        F: FnOnce() -> Result<DataFrame, DataError>,
    {
        match self
            .file_caching_mode
            .cache_path(&self.dataset_name, &self.split_name, &relative)
        {
            Some(cache_path) => cached_frame(&cache_path, self.memory_mapped, produce),
            None => produce(),
        }
    }
}

impl Iterator for DataLoader {
    type Item = Result<Sweep, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_index >= self.len() {
            return None;
        }
        let sweep = self.get(self.current_index);
        self.current_index += 1;
        Some(sweep)
    }
}

/// Euclidean range of each row of the selected coordinate columns.
fn point_ranges(frame: &DataFrame, exprs: Expr) -> Result<Vec<f32>, DataError> {
    let xyz = ndarray_from_frame::<Float32Type>(frame, exprs)?;
    Ok(xyz.outer_iter().map(|row| row.dot(&row).sqrt()).collect())
}

/// Scan the split directory and assemble the ordered capture index.
///
/// Each log directory is scanned independently in parallel; the merged
/// entries are sorted by `(log_id, timestamp_ns)` afterward, so the index is
/// identical across runs regardless of scan completion order.
fn build_file_index(split_dir: &Path) -> Result<DataFrame, DataError> {
    let mut entry_set: Vec<_> = walk_dir(split_dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect();
    entry_set.par_sort();
    if entry_set.is_empty() {
        return Err(DataError::EmptySplit {
            split_dir: split_dir.to_path_buf(),
        });
    }

    let mut keys: Vec<(String, u64)> = entry_set
        .par_iter()
        .map(|log_dir| scan_log_dir(log_dir))
        .collect::<Result<Vec<_>, DataError>>()?
        .into_iter()
        .flatten()
        .collect();
    keys.par_sort();
    if keys.is_empty() {
        return Err(DataError::EmptyFileIndex {
            split_dir: split_dir.to_path_buf(),
        });
    }

    let (log_ids, timestamps): (Vec<String>, Vec<u64>) = keys.into_iter().unzip();
    Ok(df!(
        "log_id" => log_ids,
        "timestamp_ns" => timestamps,
    )?)
}

/// Collect the `(log_id, timestamp_ns)` keys of one log directory.
fn scan_log_dir(log_dir: &Path) -> Result<Vec<(String, u64)>, DataError> {
    let log_id = extract_file_stem(log_dir)?;
    let pattern = log_dir.join("sensors").join("lidar").join("*.feather");
    let lidar_entry_set = glob(&pattern.to_string_lossy())
        .with_context(|| format!("Cannot read glob pattern: {}.", pattern.display()))?
        .filter_map(|path| path.ok())
        .collect_vec();
    lidar_entry_set
        .into_iter()
        .map(|lidar_path| Ok((log_id.clone(), parse_timestamp_ns(&lidar_path)?)))
        .collect()
}
