//! Weighted multi-criteria allocation of a fixed funding pool across regions.
//!
//! [`AllocationEngine`] turns a validated [`RegionTable`] into per-region
//! allocations that respect a per-region floor and cap and sum to the pool.
//! The [`equity`] and [`analysis`] modules build on completed runs.

pub mod allocation;
pub mod analysis;
pub mod config;
pub mod equity;
pub mod error;
pub mod regions;
pub mod telemetry;

pub use allocation::{AllocationEngine, AllocationError, AllocationOutcome, Scenario};
pub use config::{AllocationConfig, AppConfig};
pub use equity::EquitySummary;
pub use error::AppError;
pub use regions::RegionTable;
