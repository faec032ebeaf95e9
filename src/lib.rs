//! # hdlgrade
//!
//! Automated grader for hardware-description and assembly homework:
//! unpacks student archives, resolves misnamed files, runs every component
//! through the course simulator and turns the output into scores and
//! feedback.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// The built-in assignment catalogue
pub mod catalog;
/// Grader configuration and assignment definitions
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// For all things related to grading
pub mod grade;
/// For checking that the grading environment is usable
pub mod health;
/// Subprocess helpers with timeouts
pub mod process;
/// Utility functions for convenience
pub mod util;

pub use config::{AssignmentSpec, ComponentSpec, ConfigError, GraderConfig};
pub use grade::{GradingPipeline, GradingResult, Submission};
