//! Gran and Schwarz linearizing transforms.

pub mod bank;
pub mod gran;
pub mod table;

pub use bank::{DEFAULT_SWEEP_KS, all_specs, schwarz_sweep, transform_bank};
pub use gran::fit_line;
pub use table::{Transformed, formula_text, transform};
