//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - chemistry/transform selection enums (`Chemistry`, `Analyte`, `GranIndex`, ...)
//! - simulation inputs and outputs (`TitrationParameters`, `TitrationRecord`, `Curve`)
//! - validation and transform diagnostics (`ValidationReport`, `RangeWarning`)
//! - JSON file schemas (`SeriesBundle`, `MethodFile`)
//! - resolved run configurations (`SimulateConfig`, ...)

pub mod config;
pub mod files;
pub mod types;

pub use config::*;
pub use files::*;
pub use types::*;
