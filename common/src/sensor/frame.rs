use log::{debug, warn};

use super::Reading;
use crate::error::SensorError;

/// CRC-8 generator polynomial, x^8 + x^5 + x^4 + 1.
pub const CRC_POLY: u8 = 0x31;
pub const CRC_INIT: u8 = 0xFF;

/// Per-unit offset measured against a reference thermometer. It is applied on
/// top of the sensor's factory calibration.
pub const CALIBRATION_OFFSET: f64 = 6.35;

const FULL_SCALE: f64 = 65536.0;

/// Folds one data byte into the CRC accumulator, MSB first.
pub fn crc_round(data: u8, acc: u8) -> u8 {
    let mut crc = acc ^ data;
    for _ in 0..8 {
        crc = if crc & 0x80 == 0 {
            crc << 1
        } else {
            (crc << 1) ^ CRC_POLY
        };
    }
    crc
}

/// Checksum of one two-byte word as the sensor computes it: `byte0` is
/// folded first, then `byte1`.
pub fn checksum(byte0: u8, byte1: u8) -> u8 {
    crc_round(byte1, crc_round(byte0, CRC_INIT))
}

pub fn decode_temperature(raw: u16) -> f64 {
    f64::from(raw) * 175.0 / FULL_SCALE - 45.0 - CALIBRATION_OFFSET
}

pub fn decode_humidity(raw: u16) -> f64 {
    f64::from(raw) * 100.0 / FULL_SCALE
}

/// One `{msb, lsb, crc}` triple of a measurement frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channel {
    pub msb: u8,
    pub lsb: u8,
    pub crc: u8,
}

impl Channel {
    pub fn raw(&self) -> u16 {
        u16::from_be_bytes([self.msb, self.lsb])
    }

    /// Returns the raw word if the checksum byte matches.
    pub fn validate(&self) -> Result<u16, SensorError<()>> {
        let calculated = checksum(self.msb, self.lsb);
        if calculated == self.crc {
            Ok(self.raw())
        } else {
            Err(SensorError::ChecksumMismatch {
                expected: self.crc,
                calculated,
            })
        }
    }
}

/// Which channels of a frame made it into the reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub temperature: bool,
    pub humidity: bool,
}

impl ApplyOutcome {
    pub fn complete(&self) -> bool {
        self.temperature && self.humidity
    }
}

/// The 6-byte response to a measure command:
/// `[t_msb, t_lsb, t_crc, rh_msb, rh_lsb, rh_crc]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeasurementFrame(pub [u8; MeasurementFrame::LEN]);

impl MeasurementFrame {
    pub const LEN: usize = 6;

    pub fn temperature(&self) -> Channel {
        Channel {
            msb: self.0[0],
            lsb: self.0[1],
            crc: self.0[2],
        }
    }

    pub fn humidity(&self) -> Channel {
        Channel {
            msb: self.0[3],
            lsb: self.0[4],
            crc: self.0[5],
        }
    }

    /// Validates both channels independently and writes the ones that pass
    /// into `reading`. A failing channel leaves its field untouched.
    pub fn apply(&self, reading: &mut Reading) -> ApplyOutcome {
        debug!("dat = {:02x?}", self.0);

        let mut outcome = ApplyOutcome::default();

        match self.temperature().validate() {
            Ok(raw) => {
                reading.temperature = decode_temperature(raw);
                outcome.temperature = true;
            }
            Err(e) => warn!("temp crc fail: {e}"),
        }

        match self.humidity().validate() {
            Ok(raw) => {
                reading.humidity = decode_humidity(raw);
                outcome.humidity = true;
            }
            Err(e) => warn!("humid crc fail: {e}"),
        }

        outcome
    }
}

impl From<[u8; MeasurementFrame::LEN]> for MeasurementFrame {
    fn from(bytes: [u8; MeasurementFrame::LEN]) -> Self {
        Self(bytes)
    }
}
