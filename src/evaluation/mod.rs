//! # evaluation
//!
//! Benchmark evaluation utilities.

pub mod scene_flow;
