//! Data models for stylecast
//!
//! This module contains the core domain models organized by concern:
//! - Location: resolved coordinates and labels, plus the KMA grid projection
//! - Record: raw per-slot forecast values
//! - Summary: the normalized forecast day
//! - Codes: static sky and precipitation lookup tables

pub mod codes;
pub mod grid;
pub mod location;
pub mod record;
pub mod summary;

// Re-export all public types for convenient access
pub use codes::{PrecipitationKind, SkyCondition};
pub use location::{Coordinate, LocationCoordinate};
pub use record::{ForecastRecord, Observation};
pub use summary::{ForecastSummary, Temperature};
