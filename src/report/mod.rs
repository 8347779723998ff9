//! Report generation module.
//!
//! This module handles generating reports in various formats.

pub mod generator;

pub use generator::*;
