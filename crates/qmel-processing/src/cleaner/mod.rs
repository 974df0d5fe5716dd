//! Cleaning stages that run on a typed [`Table`](crate::table::Table).
//!
//! This module provides:
//! - Type coercion of numeric, date and time columns
//! - Threshold-based removal of sparse columns and rows
//! - Case normalization of categorical columns

mod coercion;
mod normalizer;
mod quality;

pub use coercion::{Coerced, TypeCoercer};
pub use normalizer::Normalizer;
pub use quality::{FilterOutcome, QualityFilter};
