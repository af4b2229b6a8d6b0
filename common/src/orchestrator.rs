//! The periodic measure-and-report loop.

use embedded_hal::delay::DelayNs;
use log::info;

use crate::config::{millis, TimingConfig};
use crate::sensor::{Reading, Thermometer};

/// Receives each cycle's reading.
pub trait Reporter {
    fn report(&mut self, reading: &Reading);
}

/// Owns the sensor and the reporter and drives them forever.
///
/// The reading persists across cycles, so a channel that fails in one cycle
/// is reported with its last good value.
pub struct Orchestrator<S, R, D> {
    sensor: S,
    reporter: R,
    delay: D,
    timing: TimingConfig,
    reading: Reading,
}

impl<S, R, D> Orchestrator<S, R, D>
where
    S: Thermometer,
    R: Reporter,
    D: DelayNs,
{
    pub fn new(sensor: S, reporter: R, delay: D, timing: TimingConfig) -> Self {
        Self {
            sensor,
            reporter,
            delay,
            timing,
            reading: Reading::default(),
        }
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    /// Wake, measure and sleep the sensor, report, then wait out the cycle
    /// period.
    pub fn run_cycle(&mut self) {
        self.sensor.cycle(&mut self.reading);
        self.reporter.report(&self.reading);
        self.delay.delay_ms(millis(self.timing.cycle_period));
    }

    /// Gives the sensor its startup settle time before the first cycle.
    pub fn start(&mut self) {
        info!("weather task started");
        self.delay.delay_ms(millis(self.timing.startup_settle));
    }

    /// Settles once, then cycles until power is removed.
    pub fn run(mut self) -> ! {
        self.start();

        loop {
            self.run_cycle();
        }
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (S, R, D) {
        (self.sensor, self.reporter, self.delay)
    }
}
