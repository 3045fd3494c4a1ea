//! Checks what a user-supplied evaluation routine wrote for one residual block.
//! Catches unwritten and non-finite residuals and Jacobian entries, and explains them.
//!
//! The cycle a solver runs for every residual block is:
//! 1. [`poison`] the output buffers with [`SENTINEL`],
//! 2. call the user's routine,
//! 3. [`is_evaluation_valid`] on what it wrote, and if that fails,
//! 4. [`render_error_report`] (or [`render_full_dump`] when debugging by hand).
//!
//! [`guard::evaluate`] runs that whole cycle over owned buffers.

pub use crate::block::{BlockShape, ResidualBlock};
pub use crate::classify::{
    EntryStatus, ValueClass, classify, classify_array, find_invalid_value, is_array_valid,
};
pub use crate::config::{Config, DEFAULT_FULL_LISTING_THRESHOLD};
pub use crate::dump::render_full_dump;
pub use crate::error::{EvaluationError, ShapeError};
pub use crate::evaluation::{Evaluation, is_cost_valid, is_evaluation_valid};
pub use crate::report::{render_error_report, render_error_report_with_config};
pub use crate::sentinel::{SENTINEL, is_sentinel, poison, poison_array};

/// Shapes of residual blocks.
mod block;
/// Classifying single values and whole arrays.
mod classify;
mod config;
/// Full dump of an evaluation, for debugging.
mod dump;
mod error;
/// Validating an evaluation.
mod evaluation;
/// Number formatting shared by dumps and reports.
pub mod format;
/// Poison, evaluate, validate, report.
pub mod guard;
/// Error reports for invalid evaluations.
mod report;
/// Pre-filling output buffers.
mod sentinel;
/// Unit tests
#[cfg(test)]
mod tests;
/// Parser for textual recordings of evaluations.
pub mod textual;
