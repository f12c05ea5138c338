//! DS18B20 1-Wire room thermometer.
//!
//! The kernel `w1-therm` driver exposes each probe as
//! `/sys/bus/w1/devices/28-*/w1_slave`, two lines of text:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first line must end in `YES` (CRC ok); the second carries the
//! temperature in millidegrees.  A CRC-failed read is retried a few times
//! before the previous good value is reused.
//!
//! ## Simulation
//!
//! With no probe present (or when simulation is requested) readings come
//! from a baseline held in a static atomic, settable with
//! [`sim_set_temperature`], plus an optional ±1.5 degC wobble.

use core::sync::atomic::{AtomicI32, Ordering};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::config::SensorConfig;

/// Family-code prefix of DS18B20 device folders.
const DS18B20_PREFIX: &str = "28";

static SIM_TEMP_MILLI_C: AtomicI32 = AtomicI32::new(21_000);

/// Set the simulated baseline temperature (degC).
pub fn sim_set_temperature(celsius: f32) {
    SIM_TEMP_MILLI_C.store((celsius * 1000.0).round() as i32, Ordering::Relaxed);
}

fn sim_baseline() -> f32 {
    SIM_TEMP_MILLI_C.load(Ordering::Relaxed) as f32 / 1000.0
}

/// Parse a `w1_slave` dump.  `None` on CRC failure or a missing `t=`.
pub fn parse_w1_slave(text: &str) -> Option<f32> {
    let mut lines = text.lines();
    if !lines.next()?.trim_end().ends_with("YES") {
        return None;
    }
    let data = lines.next()?;
    let pos = data.find("t=")?;
    let milli: i32 = data[pos + 2..].trim().parse().ok()?;
    Some(milli as f32 / 1000.0)
}

/// First `28-*` device file under `base`, if any.
pub fn find_device(base: &Path) -> Option<PathBuf> {
    let mut folders: Vec<PathBuf> = fs::read_dir(base)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(DS18B20_PREFIX))
        .map(|entry| entry.path().join("w1_slave"))
        .collect();
    folders.sort();
    folders.into_iter().next()
}

enum Source {
    Probe(PathBuf),
    Simulated { jitter: bool, state: u32 },
}

pub struct W1Thermometer {
    source: Source,
    read_retries: u32,
    retry_delay: Duration,
    last_good: f32,
}

impl W1Thermometer {
    /// Locate the probe, or fall back to simulation.
    pub fn discover(config: &SensorConfig, simulated: bool) -> Self {
        if simulated {
            info!("Thermometer: simulated");
            return Self::simulated(true);
        }
        match find_device(&config.w1_base) {
            Some(path) => {
                info!("Thermometer: DS18B20 at {}", path.display());
                Self::probe(path, config)
            }
            None => {
                warn!(
                    "Thermometer: no DS18B20 under {}, simulating",
                    config.w1_base.display()
                );
                Self::simulated(true)
            }
        }
    }

    pub fn probe(path: PathBuf, config: &SensorConfig) -> Self {
        Self {
            source: Source::Probe(path),
            read_retries: config.read_retries.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            last_good: sim_baseline(),
        }
    }

    /// Simulated thermometer; `jitter` adds the ±1.5 degC wobble.
    pub fn simulated(jitter: bool) -> Self {
        Self {
            source: Source::Simulated {
                jitter,
                state: 0x2545_F491,
            },
            read_retries: 1,
            retry_delay: Duration::ZERO,
            last_good: sim_baseline(),
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.source, Source::Simulated { .. })
    }

    /// Current temperature in degC.  Never fails.
    pub fn read(&mut self) -> f32 {
        let reading = match &mut self.source {
            Source::Probe(path) => {
                read_probe(path, self.read_retries, self.retry_delay).unwrap_or_else(|| {
                    warn!("Thermometer: read failed, reusing {}", self.last_good);
                    self.last_good
                })
            }
            Source::Simulated { jitter, state } => {
                let wobble = if *jitter { next_wobble(state) } else { 0.0 };
                sim_baseline() + wobble
            }
        };
        self.last_good = reading;
        reading
    }
}

fn read_probe(path: &Path, attempts: u32, delay: Duration) -> Option<f32> {
    for attempt in 1..=attempts {
        match fs::read_to_string(path) {
            Ok(text) => {
                if let Some(celsius) = parse_w1_slave(&text) {
                    return Some(celsius);
                }
            }
            Err(e) => warn!("Thermometer: {}: {}", path.display(), e),
        }
        if attempt < attempts {
            thread::sleep(delay);
        }
    }
    None
}

/// xorshift32 step mapped onto [-1.5, 1.5].
fn next_wobble(state: &mut u32) -> f32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    (x as f32 / u32::MAX as f32) * 3.0 - 1.5
}
