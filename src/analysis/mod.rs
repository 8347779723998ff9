//! Reporting aggregation.
//!
//! `aggregator` computes the statistics, `bundle` defines the shapes they
//! are delivered in.

pub mod aggregator;
pub mod bundle;

pub use aggregator::*;
pub use bundle::*;
