//! # constants
//!
//! Constants used in the scene-flow evaluation.

use std::str::FromStr;
use strum::EnumString;

/// Half-width of the square region containing evaluation-eligible points.
pub const EVAL_POINT_RADIUS_M: f32 = 50.;

/// Half-width of the square region tagging ground-truth rows as `close`.
/// Narrower than [`EVAL_POINT_RADIUS_M`]; the two bounds serve different
/// purposes and are tuned independently.
pub const CLOSE_POINT_RADIUS_M: f32 = 35.;

/// Minimum non-rigid displacement for a point to count as dynamic.
pub const SCENE_FLOW_DYNAMIC_THRESHOLD_M: f64 = 0.05;

/// Padding added to cuboid length and width before interior tests.
pub const BOUNDING_BOX_EXPANSION_M: f64 = 0.2;

/// Evaluation runs on every k-th capture of the split, in index order.
pub const EVAL_SUBSET_STRIDE: usize = 5;

/// Ground-truth artifact semantic class column.
pub const CLASSES_COLUMN: &str = "classes";
/// Ground-truth artifact close-range flag column.
pub const CLOSE_COLUMN: &str = "is_close";
/// Dynamic flag column (ground truth and submissions).
pub const DYNAMIC_COLUMN: &str = "is_dynamic";
/// Ground-truth artifact validity flag column.
pub const VALID_COLUMN: &str = "is_valid";
/// Flow component columns (ground truth and submissions).
pub const FLOW_COLUMNS: [&str; 3] = ["flow_tx_m", "flow_ty_m", "flow_tz_m"];
/// Mask archive entry column.
pub const MASK_COLUMN: &str = "mask";

/// Annotation categories scored by the benchmark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnotationCategories {
    Animal,
    ArticulatedBus,
    Bicycle,
    Bicyclist,
    Bollard,
    BoxTruck,
    Bus,
    ConstructionBarrel,
    ConstructionCone,
    Dog,
    LargeVehicle,
    MessageBoardTrailer,
    MobilePedestrianCrossingSign,
    Motorcycle,
    Motorcyclist,
    OfficialSignaler,
    Pedestrian,
    RailedVehicle,
    RegularVehicle,
    SchoolBus,
    Sign,
    StopSign,
    Stroller,
    TrafficLightTrailer,
    Truck,
    TruckCab,
    VehicularTrailer,
    Wheelchair,
    WheeledDevice,
    WheeledRider,
}

/// Map a category label onto its small-integer class id.
/// Background and unrecognized categories map to `0`.
pub fn category_to_class_id(category: &str) -> u8 {
    match AnnotationCategories::from_str(category) {
        Ok(category) => category as u8 + 1,
        Err(_) => 0,
    }
}
