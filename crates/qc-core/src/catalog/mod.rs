//! Catalog ingestion: raw rows in, canonical [`Event`](qc_common::Event)s out.

pub mod ingest;
pub mod magnitude;
pub mod raw;

pub use ingest::{CatalogIngestor, IngestOutcome, IngestReport, RowRejection};
pub use magnitude::to_moment_magnitude;
pub use raw::{parse_catalog, read_catalog, RawEntry, RawRow, RawTime};
