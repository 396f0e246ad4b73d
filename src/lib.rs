//! `grantit` library crate.
//!
//! The binary (`grantit`) is a thin wrapper around this library so that:
//!
//! - the chemistry, transforms and derivatives are testable without spawning processes
//! - renderers (ASCII plot, TUI) only consume curves produced by the core
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod chemistry;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod transform;
pub mod tui;
pub mod validate;
