//! Core math modules.

pub mod circular;
pub mod gamma;
pub mod linalg;
pub mod stable;
pub mod summary;
