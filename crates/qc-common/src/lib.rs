//! Quake Cycles common types, IDs, results and errors.
//!
//! This crate provides the data model shared by every pipeline stage:
//! - Canonical seismic events and their cluster assignments
//! - The closed set of celestial bodies and fixed-size per-body maps
//! - Daily feature records consumed by the regression engine
//! - Immutable result types and the final verdict bundle
//! - The unified error taxonomy

pub mod body;
pub mod error;
pub mod event;
pub mod id;
pub mod records;
pub mod results;
pub mod schema;

pub use body::{Body, BodyMap};
pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError};
pub use event::{ClusterAssignment, Event, MagnitudeType};
pub use id::{ClusterId, EventId, RunId, StudyId};
pub use records::{AnglePair, CelestialFeatures, DailyFeatureRecord, CYCLIC_CODES};
pub use results::{
    Coefficient, ConvergenceFailure, InsufficientSample, IterationRecord, ModelFailure,
    ModelOutcome, PeriodicityResult, PermutationDistribution, RegressionResult, Verdict,
};
pub use schema::SCHEMA_VERSION;
