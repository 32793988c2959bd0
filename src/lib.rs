//! # sweepflow
//!
//! Multi-sweep lidar accumulation and scene-flow evaluation artifacts.

#![warn(missing_docs)]

pub mod constants;
pub mod data_loader;
pub mod errors;
pub mod evaluation;
pub mod geometry;
pub mod io;
pub mod path;
pub mod pose;
pub mod share;
pub mod velocity;
