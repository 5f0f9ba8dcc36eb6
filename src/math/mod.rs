//! Mathematical utilities for metric extraction.
//!
//! This module provides:
//! - [`geometry`]: joint angles and inclinations on nalgebra points
//! - [`stats`]: mean, spread, median and trend helpers

pub mod geometry;
pub mod stats;

pub use geometry::{angle_at_vertex, inclination_from_vertical, midpoint, pair_center, Point};
pub use stats::{linear_slope, mean, median, sample_std_dev};
