//! # station-geo
//!
//! Coordinate pipeline for Thai polling stations.
//!
//! ## Features
//!
//! - Attribution of station coordinates to the commits that last changed them
//! - Cached geocoding of voting units
//! - Boundary-validated community corrections with audit reports
//! - Batched upload of units to a GeoJSON feature store
//!
//! ## Quick Start
//!
//! ```rust
//! use station_geo::attribution::classify;
//!
//! let verdict = classify("Bulk update coordinates", 250, Some(5));
//! println!("{} ({})", verdict.label, verdict.reason);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod attribution;
pub mod cli;
pub mod corrections;
pub mod data;
pub mod geocode;
pub mod git;
pub mod upload;
pub mod utils;

pub use crate::cli::Cli;

/// The current version of station-geo.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
