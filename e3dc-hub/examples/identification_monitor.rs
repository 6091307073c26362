//! Print the identification block of an E3DC device as it is polled.
//!
//! Usage: `cargo run --example identification_monitor -- <host> [port] [unit]`
//! The host can also come from `E3DC_HOST`. Set `E3DC_LOG_MODE=development`
//! to see the hub's own log output.

use std::sync::Arc;
use std::time::Duration;

use e3dc_hub::logging::init_logging_from_env;
use e3dc_hub::{
    sensors_for_block, DeviceDataCache, E3dcHub, HubConfig, ListenerResult, IDENTIFICATION_BLOCK,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    let mut args = std::env::args().skip(1);
    let host = args
        .next()
        .or_else(|| std::env::var("E3DC_HOST").ok())
        .ok_or("usage: identification_monitor <host> [port] [unit]")?;

    let mut config = HubConfig::new(host).with_scan_interval(Duration::from_secs(5));
    if let Some(port) = args.next() {
        config = config.with_port(port.parse()?);
    }
    if let Some(unit) = args.next() {
        config = config.with_unit(unit.parse()?);
    }

    let hub = E3dcHub::new(config)?;
    println!("Connecting to {}", hub.config().endpoint());

    let sensors = sensors_for_block(&IDENTIFICATION_BLOCK);
    for sensor in &sensors {
        hub.add_listener(sensor.clone())?;
    }

    let printer = {
        let sensors = sensors.clone();
        move |_: &DeviceDataCache| -> ListenerResult {
            println!("--- update ---");
            for sensor in &sensors {
                let value = sensor
                    .state()
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "unavailable".to_string());
                println!("{:<32} {}", sensor.name(), value);
            }
            Ok(())
        }
    };
    hub.add_listener(Arc::new(printer))?;

    std::thread::sleep(Duration::from_secs(30));

    let stats = hub.stats();
    println!(
        "{} polls, {} failed; device: {}",
        stats.ticks,
        stats.failed_refreshes,
        serde_json::to_string(&hub.device_info())?
    );

    hub.shutdown();
    Ok(())
}
