use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::netif::IpEvent;
use esp_idf_svc::sys::{esp, EspError};
use esp_idf_svc::wifi::{EspWifi, WifiEvent};
use log::{debug, info};

use weather_node_common::config::WifiConfig;
use weather_node_common::{ConnectionManager, LinkControl, LinkEvent};

/// Issues `esp_wifi_connect` from the event callback context.
pub struct EspLink;

impl LinkControl for EspLink {
    type Error = EspError;

    fn connect(&mut self) -> Result<(), EspError> {
        esp!(unsafe { esp_idf_svc::sys::esp_wifi_connect() })
    }
}

pub type Connection = ConnectionManager<EspLink>;

/// Keeps the event subscriptions alive. Dropping this unregisters them.
pub struct LinkEvents {
    _wifi: EspSubscription<'static, System>,
    _ip: EspSubscription<'static, System>,
}

/// Routes station and DHCP events from the system event loop into the
/// connection state machine.
pub fn subscribe(sysloop: &EspSystemEventLoop, connection: &Connection) -> anyhow::Result<LinkEvents> {
    let events = connection.clone();
    let wifi = sysloop.subscribe::<WifiEvent, _>(move |event| {
        debug!("wifi event: {event:?}");
        match event {
            WifiEvent::StaStarted => {
                events.handle_event(LinkEvent::LinkStarted);
            }
            WifiEvent::StaDisconnected(_) => {
                events.handle_event(LinkEvent::LinkLost);
            }
            _ => {}
        }
    })?;

    let events = connection.clone();
    let ip = sysloop.subscribe::<IpEvent, _>(move |event| {
        if let IpEvent::DhcpIpAssigned(assignment) = event {
            info!("ip: {}", assignment.ip());
            events.handle_event(LinkEvent::AddressAcquired);
        }
    })?;

    Ok(LinkEvents { _wifi: wifi, _ip: ip })
}

/// Puts the driver in station mode with the compiled-in credentials and
/// starts it. Connecting happens from the `StaStarted` event.
pub fn start(wifi: &mut EspWifi<'static>, config: &WifiConfig) -> anyhow::Result<()> {
    let wifi_configuration: Configuration = Configuration::Client(ClientConfiguration {
        ssid: config
            .ssid
            .try_into()
            .map_err(|_| anyhow::anyhow!("SSID too long"))?,
        bssid: None,
        auth_method: AuthMethod::WPA2Personal,
        password: config
            .password
            .try_into()
            .map_err(|_| anyhow::anyhow!("password too long"))?,
        channel: None,
        ..Default::default()
    });

    wifi.set_configuration(&wifi_configuration)?;

    wifi.start()?;
    info!("Wifi started");

    Ok(())
}
