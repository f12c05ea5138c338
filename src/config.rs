//! Agent configuration parameters
//!
//! Process-level settings read once at start-up from a JSON file.  Every
//! field has a default, so an empty object (or a missing file) yields a
//! runnable simulated agent.  The desired configuration pushed from the
//! cloud is a separate thing, see [`crate::desired`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use log::info;
use serde::Deserialize;

use crate::control::alert::AlertThresholds;
use crate::scheduler::FallbackPolicy;
use crate::setpoint::SetpointDomain;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "device_config.json";

/// Core agent configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    // --- Identity ---
    /// Name used for the MQTT client id and topic prefix
    pub device_id: String,
    /// Run without sensor or IR hardware
    pub simulated: bool,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,

    // --- Control ---
    /// Seconds between samples during the interruptible sleep
    pub sampling_period_secs: u32,
    pub alert: AlertThresholds,
    pub setpoint: SetpointDomain,
    pub fallback: FallbackPolicy,

    // --- Storage ---
    /// Where the desired configuration is persisted
    pub state_path: PathBuf,

    // --- Hardware ---
    pub ir: IrConfig,
    pub sensor: SensorConfig,

    // --- Optional collaborators ---
    pub mqtt: Option<MqttConfig>,
    pub weather: Option<WeatherConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            device_id: "climate-agent".into(),
            simulated: false,
            log_level: "info".into(),

            sampling_period_secs: 10,
            alert: AlertThresholds::default(),
            setpoint: SetpointDomain::default(),
            fallback: FallbackPolicy::default(),

            state_path: PathBuf::from("desired_state.json"),

            ir: IrConfig::default(),
            sensor: SensorConfig::default(),

            mqtt: None,
            weather: None,
        }
    }
}

/// LIRC transmitter settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IrConfig {
    /// Remote name in the lircd configuration
    pub remote: String,
    /// Transmissions per command (one-way link, so codes are repeated)
    pub repeats: u8,
    /// Pause between repeats
    pub repeat_delay_ms: u64,
    pub irsend_path: PathBuf,
}

impl Default for IrConfig {
    fn default() -> Self {
        Self {
            remote: "LG_AC".into(),
            repeats: 1,
            repeat_delay_ms: 1000,
            irsend_path: PathBuf::from("irsend"),
        }
    }
}

/// DS18B20 1-Wire sensor settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensorConfig {
    /// Directory holding `28-*` device folders
    pub w1_base: PathBuf,
    /// Attempts before giving up on a CRC-failed read
    pub read_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            w1_base: PathBuf::from("/sys/bus/w1/devices"),
            read_retries: 50,
            retry_delay_ms: 200,
        }
    }
}

/// MQTT transport settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    /// Defaults to the device id
    pub client_id: Option<String>,
    /// Defaults to `climate/<device id>`
    pub topic_prefix: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: None,
            topic_prefix: None,
            username: None,
            password: None,
            keep_alive_secs: 30,
        }
    }
}

/// OpenWeatherMap-compatible current-weather source
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeatherConfig {
    pub endpoint: String,
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub refresh_secs: u64,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://api.openweathermap.org/data/2.5/weather".into(),
            api_key: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            refresh_secs: 3600,
            timeout_secs: 10,
        }
    }
}

impl AgentConfig {
    /// Read `path`.  A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Config: {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the agent cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sampling_period_secs == 0 || self.sampling_period_secs > 3600 {
            bail!("samplingPeriodSecs must be in 1..=3600, got {}", self.sampling_period_secs);
        }
        if !(self.alert.low < self.alert.high) {
            bail!(
                "alert.low ({}) must be below alert.high ({})",
                self.alert.low,
                self.alert.high
            );
        }
        if self.ir.repeats == 0 {
            bail!("ir.repeats must be at least 1");
        }
        if self.device_id.trim().is_empty() {
            bail!("deviceId must not be empty");
        }
        if let Some(weather) = &self.weather {
            if weather.refresh_secs == 0 {
                bail!("weather.refreshSecs must be at least 1");
            }
        }
        Ok(())
    }

    pub fn sampling_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.sampling_period_secs))
    }

    pub fn topic_prefix(&self) -> String {
        self.mqtt
            .as_ref()
            .and_then(|m| m.topic_prefix.clone())
            .unwrap_or_else(|| format!("climate/{}", self.device_id))
    }
}
