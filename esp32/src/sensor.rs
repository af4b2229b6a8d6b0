use core::time::Duration;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use esp_idf_svc::hal::delay::{TickType, BLOCK};
use esp_idf_svc::hal::gpio::{InputPin, OutputPin};
use esp_idf_svc::hal::i2c::{I2c as I2cPeripheral, I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::sys::EspError;

use weather_node_common::config::SensorConfig;

#[derive(Debug)]
pub struct BusError(pub EspError);

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// `I2cDriver` with a configurable per-transaction timeout. `None` blocks
/// until the driver completes.
pub struct SensorBus {
    driver: I2cDriver<'static>,
    timeout: u32,
}

impl SensorBus {
    pub fn new<I2C: I2cPeripheral>(
        i2c: impl Peripheral<P = I2C> + 'static,
        sda: impl Peripheral<P = impl InputPin + OutputPin> + 'static,
        scl: impl Peripheral<P = impl InputPin + OutputPin> + 'static,
        config: &SensorConfig,
    ) -> Result<Self, EspError> {
        let bus_config = I2cConfig::new()
            .baudrate(config.clock_hz.Hz())
            .sda_enable_pullup(config.internal_pullups)
            .scl_enable_pullup(config.internal_pullups);
        let driver = I2cDriver::new(i2c, sda, scl, &bus_config)?;

        Ok(Self {
            driver,
            timeout: ticks(config.bus_timeout),
        })
    }
}

fn ticks(timeout: Option<Duration>) -> u32 {
    timeout.map_or(BLOCK, |limit| TickType::from(limit).ticks())
}

impl ErrorType for SensorBus {
    type Error = BusError;
}

impl I2c for SensorBus {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), BusError> {
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.driver.write(address, bytes, self.timeout),
                Operation::Read(buf) => self.driver.read(address, buf, self.timeout),
            }
            .map_err(BusError)?;
        }
        Ok(())
    }
}
