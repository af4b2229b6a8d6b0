//! Compiled-in node configuration.
//!
//! There is no runtime reconfiguration: the firmware builds one
//! [`NodeConfig`] at startup from constants and build-time environment
//! variables and hands the pieces to the components that need them.

use core::time::Duration;

/// Station credentials and the link-loss bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WifiConfig {
    pub ssid: &'static str,
    pub password: &'static str,
    /// Number of link-lost events tolerated before giving up for good.
    pub max_retries: u8,
}

impl WifiConfig {
    pub const MAX_RETRIES: u8 = 5;

    pub const fn new(ssid: &'static str, password: &'static str) -> Self {
        Self {
            ssid,
            password,
            max_retries: Self::MAX_RETRIES,
        }
    }
}

/// A plain-HTTP host and port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: &'static str,
    pub port: u16,
}

impl Endpoint {
    pub const fn new(host: &'static str, port: u16) -> Self {
        Self { host, port }
    }

    /// Full `http://` URL for `path` on this endpoint.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.host, self.port, path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SensorConfig {
    /// 7-bit bus address of the SHTC3.
    pub address: u8,
    pub clock_hz: u32,
    pub internal_pullups: bool,
    /// Conversion time to wait between the measure command and the read.
    pub settle: Duration,
    /// Per-transaction bus timeout, `None` blocks until the driver returns.
    pub bus_timeout: Option<Duration>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            address: 0x70,
            clock_hz: 400_000,
            internal_pullups: true,
            settle: Duration::from_millis(20),
            bus_timeout: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimingConfig {
    /// Delay before the first reporting cycle.
    pub startup_settle: Duration,
    /// Delay between the end of one cycle and the start of the next.
    pub cycle_period: Duration,
    /// How long startup waits for the link, `None` waits forever.
    pub connect_timeout: Option<Duration>,
    /// Per-request HTTP timeout, `None` uses the HTTP client's default.
    pub http_timeout: Option<Duration>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            startup_settle: Duration::from_secs(2),
            cycle_period: Duration::from_secs(2),
            connect_timeout: None,
            http_timeout: None,
        }
    }
}

/// What startup does once the link has reached a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartupPolicy {
    /// Refuse to enter the reporting loop when the link ended up `Failed`.
    pub require_connectivity: bool,
}

impl Default for StartupPolicy {
    fn default() -> Self {
        Self {
            require_connectivity: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfig {
    pub wifi: WifiConfig,
    pub collector: Endpoint,
    pub forecast: Endpoint,
    pub sensor: SensorConfig,
    pub timing: TimingConfig,
    pub startup: StartupPolicy,
}

impl NodeConfig {
    pub const COLLECTOR_PORT: u16 = 1234;
    pub const FORECAST: Endpoint = Endpoint::new("wttr.in", 80);

    pub fn new(wifi: WifiConfig, collector_host: &'static str) -> Self {
        Self {
            wifi,
            collector: Endpoint::new(collector_host, Self::COLLECTOR_PORT),
            forecast: Self::FORECAST,
            sensor: SensorConfig::default(),
            timing: TimingConfig::default(),
            startup: StartupPolicy::default(),
        }
    }
}

/// Converts a duration into whole milliseconds for `DelayNs::delay_ms`,
/// saturating at `u32::MAX`.
pub fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
