//! SHTC3 humidity/temperature sensor: command set, frame decoding and the
//! blocking bus driver.

mod command;
mod driver;
mod frame;

pub use command::Command;
pub use driver::{Shtc3, Thermometer};
pub use frame::{
    checksum, crc_round, decode_humidity, decode_temperature, ApplyOutcome, Channel,
    MeasurementFrame, CALIBRATION_OFFSET, CRC_INIT, CRC_POLY,
};

/// The last known local conditions.
///
/// Decoding writes into an existing `Reading`, so a channel that fails
/// validation keeps the value from the previous cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
}
