//! Climate agent: main entry point.
//!
//! Wires the adapters around the reconciliation loop and runs it until
//! SIGINT / SIGTERM.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      MqttCloud / LogCloud   FileConfigStore   │
//! │  (Temperature + IR)   (CloudPort)            (ConfigPort)      │
//! │  WeatherCache         SystemClock            signal watcher    │
//! │  (WeatherPort)        (Clock)                (shutdown)        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │                Reconciler (pure logic)                 │    │
//! │  │  Filter · Alert · Actuator · Fallback · DesiredStore   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use climate_agent::adapters::device_id;
use climate_agent::adapters::file_store::FileConfigStore;
use climate_agent::adapters::hardware::HardwareAdapter;
use climate_agent::adapters::log_cloud::LogCloud;
use climate_agent::adapters::mqtt::MqttCloud;
use climate_agent::adapters::signal;
use climate_agent::adapters::time::SystemClock;
use climate_agent::adapters::weather::{WeatherCache, WeatherRefresher};
use climate_agent::app::inbox::ConfigInbox;
use climate_agent::app::ports::CloudPort;
use climate_agent::app::service::{LoopSettings, Reconciler};
use climate_agent::config::{AgentConfig, DEFAULT_CONFIG_PATH};
use climate_agent::desired::DesiredStore;

// ── Logging ───────────────────────────────────────────────────

/// Install the fmt subscriber.  `RUST_LOG` overrides the configured
/// level; `log` records from the library are bridged in.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Configuration and logging ──────────────────────────
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = AgentConfig::load(&config_path)?;
    init_logging(&config.log_level);

    info!("╔══════════════════════════════════════╗");
    info!("║  climate-agent v{:<21}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    info!(
        "Device '{}' config {} (simulated={})",
        config.device_id,
        config_path.display(),
        config.simulated
    );

    // ── 2. Hand-off slot and operator shutdown ────────────────
    let inbox = Arc::new(ConfigInbox::new());
    signal::install(Arc::clone(&inbox))?;

    // ── 3. Desired state (persisted or defaults) ──────────────
    let store = DesiredStore::boot(
        Box::new(FileConfigStore::new(&config.state_path)),
        config.setpoint,
    );

    // ── 4. Hardware ───────────────────────────────────────────
    let hw = HardwareAdapter::from_config(&config);

    // ── 5. Cloud transport ────────────────────────────────────
    let cloud: Box<dyn CloudPort> = match &config.mqtt {
        Some(mqtt) => Box::new(MqttCloud::start(
            mqtt,
            &config.device_id,
            &config.topic_prefix(),
            Arc::clone(&inbox),
        )),
        None => {
            info!("No MQTT broker configured, reporting to log only");
            Box::new(LogCloud::new())
        }
    };

    // ── 6. Weather ────────────────────────────────────────────
    let weather = WeatherCache::new();
    let _refresher = config.weather.as_ref().and_then(|w| {
        WeatherRefresher::spawn(w, weather.clone())
            .map_err(|e| warn!("Weather disabled: {:#}", e))
            .ok()
    });

    // ── 7. Reconciliation loop ────────────────────────────────
    let settings = LoopSettings {
        sampling_period: config.sampling_period(),
        thresholds: config.alert,
        fallback: config.fallback,
        ip_address: device_id::primary_ip(),
    };
    let mut reconciler = Reconciler::new(hw, cloud, weather, SystemClock, store, inbox, settings);
    reconciler.run();

    info!("climate-agent stopped");
    Ok(())
}
