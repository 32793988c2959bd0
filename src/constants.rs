//! # constants
//!
//! Common constants used throughout the library.

/// Lidar coordinate columns.
/// Found in `sensors/lidar/<timestamp_ns>.feather`.
pub const XYZ_COLUMNS: [&str; 3] = ["x", "y", "z"];

/// Scalar-first quaternion columns.
pub const QUAT_WXYZ_COLUMNS: [&str; 4] = ["qw", "qx", "qy", "qz"];

/// Translation columns.
pub const TRANSLATION_COLUMNS: [&str; 3] = ["tx_m", "ty_m", "tz_m"];

/// Pose dataframe columns.
/// Found in `city_SE3_egovehicle.feather`.
pub const POSE_COLUMNS: [&str; 7] = ["tx_m", "ty_m", "tz_m", "qw", "qx", "qy", "qz"];

/// Annotation dataframe columns.
/// Found in `annotations.feather`.
pub const ANNOTATION_COLUMNS: [&str; 13] = [
    "tx_m",
    "ty_m",
    "tz_m",
    "length_m",
    "width_m",
    "height_m",
    "qw",
    "qx",
    "qy",
    "qz",
    "num_interior_pts",
    "category",
    "track_uuid",
];

/// Cuboid pose and size columns.
/// Found in `annotations.feather`.
pub const CUBOID_COLUMNS: [&str; 10] = [
    "tx_m",
    "ty_m",
    "tz_m",
    "length_m",
    "width_m",
    "height_m",
    "qw",
    "qx",
    "qy",
    "qz",
];

/// File index columns: one `(sequence, timestamp)` row per capture.
pub const FILE_INDEX_COLUMNS: [&str; 2] = ["log_id", "timestamp_ns"];

/// Per-point nanoseconds elapsed since the queried capture.
pub const TIMEDELTA_COLUMN: &str = "timedelta_ns";

/// Per-point range from the ego origin.
pub const DISTANCE_COLUMN: &str = "distance";

/// Optional per-point ground classification.
pub const GROUND_COLUMN: &str = "is_ground";

/// Estimated per-annotation velocity columns (city frame, m/s).
pub const VELOCITY_COLUMNS: [&str; 3] = ["vx_m", "vy_m", "vz_m"];
