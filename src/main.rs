use std::{
    process,
    sync::{Arc, OnceLock},
    time::Duration,
};

use airbee::{
    config::Config,
    core::{
        fanout::{DeviceIdentity, MqttFanout},
        poller::{PollLoop, ReadingSink},
        sensor,
        state::StateStore,
    },
    exporter::{http::HttpServer, SensorMetrics},
    logger::LoggerManager,
    print_error,
};
use tracing::{error, info};

static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::new().unwrap_or_else(|e| {
            print_error!("{}", e);
            process::exit(1);
        })
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config();
    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting airbee version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| {
            error!("failed to get hostname, setting to unknown");
            "unknown".to_string()
        });

    let identity = DeviceIdentity {
        bus: cfg.sensor.bus,
        address: cfg.sensor.address,
    };

    // A process without a usable sensor has nothing to serve.
    let reader = sensor::open(identity.bus, identity.address).unwrap_or_else(|e| {
        error!("failed to open I2C bus: {}", e);
        process::exit(1);
    });
    info!(
        "Sensor opened on /dev/i2c-{} at address 0x{:02X}",
        identity.bus, identity.address
    );

    let store = StateStore::new();
    let metrics = Arc::new(SensorMetrics::new(
        store.clone(),
        cfg.exporter.labels.clone(),
    ));

    let listen_addr = cfg.exporter.listen_addr().unwrap_or_else(|e| {
        error!(
            "invalid listen address '{}': {}",
            cfg.exporter.listen_address, e
        );
        process::exit(1);
    });
    let server = HttpServer::new(metrics, listen_addr, cfg.exporter.metrics_path.clone());

    // A broken fan-out setup degrades the agent to scrape-only; the poll
    // loop and the endpoint do not depend on the broker.
    let sink: Option<Arc<dyn ReadingSink>> = if cfg.mqtt.enabled {
        match MqttFanout::connect(
            &cfg.mqtt,
            identity,
            hostname.clone(),
            cfg.exporter.labels.clone(),
        ) {
            Ok(fanout) => {
                info!(
                    "MQTT fan-out enabled: {}:{} topic '{}'",
                    cfg.mqtt.host, cfg.mqtt.port, cfg.mqtt.topic
                );
                Some(Arc::new(fanout))
            }
            Err(e) => {
                error!("failed to set up MQTT fan-out: {}", e);
                None
            }
        }
    } else {
        None
    };

    let poller = PollLoop::new(
        reader,
        store,
        sink,
        Duration::from_secs(cfg.sensor.poll_interval_secs),
    );
    info!(
        "Starting poll loop (interval: {}s)",
        cfg.sensor.poll_interval_secs
    );

    tokio::select! {
        _ = poller.run() => {
            error!("Poll loop unexpectedly finished");
        }
        result = server.run() => {
            if let Err(e) = result {
                error!("Scrape endpoint failed: {}", e);
                process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C — shutting down");
        }
    }
    Ok(())
}
