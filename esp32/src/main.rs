use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;

use log::{error, info};

use weather_node_common::config::WifiConfig;
use weather_node_common::startup::await_connectivity;
use weather_node_common::{ConnectionManager, ForecastClient, NodeConfig, Orchestrator, Shtc3};

mod http;
mod sensor;
mod wifi;

const SSID: &str = env!("WIFI_SSID");
const PASSWORD: &str = env!("WIFI_PASS");
const COLLECTOR_HOST: &str = match option_env!("COLLECTOR_HOST") {
    Some(host) => host,
    None => "192.168.1.80",
};

const WEATHER_TASK_STACK: usize = 8192;

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    let config = NodeConfig::new(WifiConfig::new(SSID, PASSWORD), COLLECTOR_HOST);

    let peripherals = Peripherals::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // Link bring-up. The driver and the subscriptions must outlive the
    // weather task, so they stay owned by `main`, which never returns.
    let mut wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    let connection = ConnectionManager::new(config.wifi.ssid, config.wifi.max_retries, wifi::EspLink);
    let _events = wifi::subscribe(&sysloop, &connection)?;
    wifi::start(&mut wifi, &config.wifi)?;

    await_connectivity(&connection, &config.timing, config.startup)?;

    // SDA on GPIO10, SCL on GPIO8.
    let bus = sensor::SensorBus::new(
        peripherals.i2c0,
        peripherals.pins.gpio10,
        peripherals.pins.gpio8,
        &config.sensor,
    )
    .inspect_err(|e| error!("i2c bus: {e}"))?;
    let mut shtc3 = Shtc3::new(bus, FreeRtos, &config.sensor);
    if let Err(e) = shtc3.initialize() {
        error!("shtc3_init: {e}");
    }

    let mut forecast = ForecastClient::from_config(
        http::EspHttpTransport::new(config.timing.http_timeout),
        &config,
    );
    forecast.lookup_location();

    let orchestrator = Orchestrator::new(shtc3, forecast, FreeRtos, config.timing.clone());
    let task = std::thread::Builder::new()
        .name("weather_task".into())
        .stack_size(WEATHER_TASK_STACK)
        .spawn(move || orchestrator.run())?;
    info!("weather task spawned");

    task.join()
        .map_err(|_| anyhow::anyhow!("weather task panicked"))?;

    Ok(())
}
