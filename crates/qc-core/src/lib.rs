//! Quake Cycles core library.
//!
//! This library runs a study of whether daily mainshock counts depend on
//! calendar codes or an external celestial signal:
//! - Catalog ingestion with magnitude harmonization and deduplication
//! - Window-based aftershock declustering
//! - Daily feature tables (cyclic codes, day conventions, signal reindexing)
//! - Negative-binomial regression against a trend and seasonality baseline
//! - Schuster periodicity test and permutation validation
//! - Secondary diagnostics and the final verdict bundle

pub mod catalog;
pub mod decluster;
pub mod diagnostics;
pub mod features;
pub mod geo;
pub mod logging;
pub mod montecarlo;
pub mod periodicity;
pub mod pipeline;
pub mod regression;
pub mod verdict;

pub use pipeline::Study;
pub use verdict::VerdictBundle;
