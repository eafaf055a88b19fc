//! Quake-cycles math utilities.

pub mod math;

pub use math::circular::*;
pub use math::gamma::*;
pub use math::linalg::{independent_columns, Cholesky, LinalgError, Matrix};
pub use math::stable::*;
pub use math::summary::*;
