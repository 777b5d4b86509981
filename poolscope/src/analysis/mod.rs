//! Hang-point analysis
//!
//! Aggregates worker stack records by their top frame to identify where the
//! saturated pool's workers are stuck.

pub mod hang_aggregator;

pub use hang_aggregator::{HangAggregator, HangPoint};
