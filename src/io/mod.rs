//! Input/output helpers.
//!
//! - data file ingest + validation (`ingest`)
//! - text/CSV curve exports (`export`)
//! - series bundle JSON read/write (`bundle`)
//! - method file JSON read/write (`method`)

pub mod bundle;
pub mod export;
pub mod ingest;
pub mod method;

pub use bundle::*;
pub use export::*;
pub use ingest::*;
pub use method::*;
