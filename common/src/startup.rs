//! Connectivity gate between link bring-up and the reporting loop.

use log::{error, info, warn};

use crate::config::{StartupPolicy, TimingConfig};
use crate::connection::{ConnectionManager, ConnectionState, LinkControl};
use crate::error::StartupError;

/// Decides whether startup may continue from the terminal link state.
pub fn resolve(
    state: ConnectionState,
    policy: StartupPolicy,
    ssid: &str,
    retries: u8,
) -> Result<(), StartupError> {
    match state {
        ConnectionState::Connected => {
            info!("connected to {ssid}");
            Ok(())
        }
        _ if policy.require_connectivity => {
            error!("failed to connect to {ssid}");
            Err(StartupError::ConnectionFailed {
                ssid: ssid.to_string(),
                retries,
            })
        }
        _ => {
            warn!("continuing without connection to {ssid}");
            Ok(())
        }
    }
}

/// Blocks until the link settles, then applies `policy`.
pub fn await_connectivity<L: LinkControl>(
    manager: &ConnectionManager<L>,
    timing: &TimingConfig,
    policy: StartupPolicy,
) -> Result<ConnectionState, StartupError> {
    let state = manager.wait_terminal(timing.connect_timeout)?;
    resolve(state, policy, manager.ssid(), manager.snapshot().retries)?;
    Ok(state)
}
