//! `ridehub-core` — ids, timestamps and configuration shared by every RideHub crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::RidehubConfig;
pub use error::{Result, RidehubError};
pub use types::{DriverId, ReservationId, VehicleId};
