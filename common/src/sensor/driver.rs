use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, error, info};

use super::{ApplyOutcome, Command, MeasurementFrame, Reading};
use crate::config::{millis, SensorConfig};
use crate::error::SensorError;

/// Something that can refresh a [`Reading`] in place.
pub trait Thermometer {
    /// Runs one full wake/measure/sleep cycle. Failures are logged and leave
    /// the affected fields of `reading` at their previous values.
    fn cycle(&mut self, reading: &mut Reading);
}

/// Blocking SHTC3 driver.
///
/// The driver owns the bus for the lifetime of the process. Every
/// transaction is preceded by an address probe, because the bus may be noisy
/// or the device may have been power cycled behind our back. The probe is
/// best effort: it is logged and never gates the transaction that follows.
pub struct Shtc3<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    settle_ms: u32,
}

impl<I2C, D> Shtc3<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D, config: &SensorConfig) -> Self {
        Self {
            i2c,
            delay,
            address: config.address,
            settle_ms: millis(config.settle),
        }
    }

    /// Confirms that the device answers on its address.
    pub fn initialize(&mut self) -> Result<(), SensorError<I2C::Error>> {
        self.i2c.write(self.address, &[]).map_err(SensorError::Bus)?;
        info!("shtc3 found at {:#04x}", self.address);
        Ok(())
    }

    /// Zero-length addressing transaction.
    pub fn probe(&mut self) {
        if let Err(e) = self.i2c.write(self.address, &[]) {
            error!("shtc3_probe: {e:?}");
        }
    }

    pub fn write_command(&mut self, command: Command) -> Result<(), SensorError<I2C::Error>> {
        self.probe();

        let frame = command.to_bytes();
        debug!("{} = {:02x?}", command.name(), frame);
        self.i2c.write(self.address, &frame).map_err(SensorError::Bus)
    }

    pub fn read_frame(&mut self) -> Result<MeasurementFrame, SensorError<I2C::Error>> {
        self.probe();

        let mut buf = [0u8; MeasurementFrame::LEN];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(SensorError::Bus)?;
        Ok(MeasurementFrame(buf))
    }

    /// Triggers a measurement, waits out the conversion time and decodes the
    /// result into `reading`.
    ///
    /// A failed MEASURE write is logged only. The conversion may still have
    /// started, so the settle delay and the read always follow.
    pub fn measure(
        &mut self,
        reading: &mut Reading,
    ) -> Result<ApplyOutcome, SensorError<I2C::Error>> {
        self.probe();
        if let Err(e) = self.write_command(Command::Measure) {
            error!("shtc3 measure command: {e}");
        }

        self.delay.delay_ms(self.settle_ms);

        let frame = self.read_frame()?;
        Ok(frame.apply(reading))
    }

    /// Gives back the bus and delay provider.
    #[cfg(test)]
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C, D> Thermometer for Shtc3<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    fn cycle(&mut self, reading: &mut Reading) {
        if let Err(e) = self.write_command(Command::Wake) {
            error!("shtc3 wakeup: {e}");
        }

        match self.measure(reading) {
            Ok(outcome) if !outcome.complete() => debug!("shtc3 measure: stale channels {outcome:?}"),
            Ok(_) => {}
            Err(e) => error!("shtc3 measure: {e}"),
        }

        // The sensor has to go back to sleep even after a failed measurement.
        if let Err(e) = self.write_command(Command::Sleep) {
            error!("shtc3 sleep: {e}");
        }
    }
}
