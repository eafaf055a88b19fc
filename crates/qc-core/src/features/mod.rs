//! Feature construction: date codes, day conventions, the external
//! celestial signal and the daily table that joins them.

pub mod calendar;
pub mod encoder;
pub mod numerology;
pub mod signal;

pub use calendar::{assign_day, event_day, sunrise_utc};
pub use encoder::{CelestialColumns, FeatureEncoder, FeatureTable};
pub use numerology::{cyclic_code, master_number};
pub use signal::{BodyReading, CelestialSignal};
