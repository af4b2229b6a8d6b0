//! Portable core of the weather node firmware.
//!
//! Everything in here is generic over `embedded-hal` traits and the small
//! [`forecast::HttpTransport`] seam, so it runs unchanged on the ESP32 and in
//! host unit tests.

pub mod config;
pub mod connection;
pub mod error;
pub mod forecast;
pub mod orchestrator;
pub mod sensor;
pub mod startup;

pub use config::NodeConfig;
pub use connection::{ConnectionManager, ConnectionState, LinkControl, LinkEvent};
pub use error::{CapacityError, HttpError, SensorError, StartupError};
pub use forecast::{ForecastClient, HttpTransport};
pub use orchestrator::Orchestrator;
pub use sensor::{Reading, Shtc3};
