//! Schema version of serialized outputs.

/// Version of the verdict bundle layout. Bumped on breaking field changes.
pub const SCHEMA_VERSION: &str = "1.0.0";
