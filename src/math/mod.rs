//! Numerical utilities: discrete derivatives and least squares.

pub mod derivative;
pub mod ols;

pub use derivative::{DerivativeSet, DerivativeSummary, analyze, derivative, second_derivative};
pub use ols::*;
