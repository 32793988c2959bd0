//! # geometry
//!
//! Geometric operations for data processing.

/// Geometric algorithms for cuboids.
pub mod polytope;
/// Special Euclidean Group 3.
pub mod se3;
/// Special Orthogonal Group 3.
pub mod so3;
