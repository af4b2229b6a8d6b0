use thiserror::Error;

/// Errors raised while talking to the humidity/temperature sensor.
#[derive(Debug, Error)]
pub enum SensorError<E>
where
    E: core::fmt::Debug,
{
    /// Underlying bus error from the HAL implementation.
    #[error("bus error: {0:?}")]
    Bus(E),

    /// A measurement channel failed its CRC-8 check.
    #[error("checksum mismatch: expected {expected:#04x}, calculated {calculated:#04x}")]
    ChecksumMismatch { expected: u8, calculated: u8 },
}

/// Errors raised by an HTTP exchange.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// A bounded buffer could not hold the data written into it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("buffer overflow: needed {needed}, capacity {capacity}")]
pub struct CapacityError {
    pub needed: usize,
    pub capacity: usize,
}

/// Errors that stop the node from entering its reporting loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartupError {
    #[error("failed to connect to {ssid} after {retries} retries")]
    ConnectionFailed { ssid: String, retries: u8 },

    #[error("no connection after waiting {0:?}")]
    ConnectTimeout(core::time::Duration),
}
