//! Outdoor weather cache.
//!
//! A background thread polls an OpenWeatherMap-compatible "current
//! weather" endpoint on its own cadence (hourly by default) and keeps the
//! latest good reading.  The loop only ever reads the cache, so a slow or
//! dead weather service never delays a cycle.  A failed fetch keeps the
//! previous reading.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Utc;
use log::{info, warn};
use parking_lot::{Condvar, Mutex};
use serde::Deserialize;

use crate::app::ports::WeatherPort;
use crate::app::reports::WeatherReading;
use crate::config::WeatherConfig;

// ── Response shape ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainBlock,
    #[serde(default)]
    wind: WindBlock,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

#[derive(Debug, Default, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: f64,
}

/// Parse a current-weather response body.
pub fn parse_current(body: &str) -> anyhow::Result<WeatherReading> {
    let current: CurrentWeather = serde_json::from_str(body).context("weather response")?;
    Ok(WeatherReading {
        temp: current.main.temp,
        wind: current.wind.speed,
        fetched_utctime: Utc::now(),
    })
}

// ── Cache ────────────────────────────────────────────────────

/// Shared latest reading.  Clones see the same value.
#[derive(Debug, Clone, Default)]
pub struct WeatherCache {
    latest: Arc<Mutex<Option<WeatherReading>>>,
}

impl WeatherCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, reading: WeatherReading) {
        *self.latest.lock() = Some(reading);
    }
}

impl WeatherPort for WeatherCache {
    fn latest(&self) -> Option<WeatherReading> {
        self.latest.lock().clone()
    }
}

// ── Refresher ────────────────────────────────────────────────

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    signal: Condvar,
}

/// Owns the polling thread.  Dropping it stops the thread.
pub struct WeatherRefresher {
    stop: Arc<StopSignal>,
    worker: Option<JoinHandle<()>>,
}

impl WeatherRefresher {
    pub fn spawn(config: &WeatherConfig, cache: WeatherCache) -> anyhow::Result<Self> {
        if config.api_key.is_empty() {
            bail!("weather.apiKey is empty");
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("building weather HTTP client")?;
        let stop = Arc::new(StopSignal::default());
        let worker = {
            let config = config.clone();
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("weather".into())
                .spawn(move || poll(&client, &config, &cache, &stop))
                .context("spawning weather thread")?
        };
        info!(
            "Weather: polling every {}s for {:.2},{:.2}",
            config.refresh_secs, config.latitude, config.longitude
        );
        Ok(Self {
            stop,
            worker: Some(worker),
        })
    }

    pub fn stop(&mut self) {
        *self.stop.stopped.lock() = true;
        self.stop.signal.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for WeatherRefresher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll(
    client: &reqwest::blocking::Client,
    config: &WeatherConfig,
    cache: &WeatherCache,
    stop: &StopSignal,
) {
    let period = Duration::from_secs(config.refresh_secs.max(1));
    loop {
        match fetch(client, config) {
            Ok(reading) => {
                info!(
                    "Weather: {:.1}\u{00b0}C wind {:.1}m/s at {}",
                    reading.temp, reading.wind, reading.fetched_utctime
                );
                cache.store(reading);
            }
            Err(e) => warn!("Weather: fetch failed, keeping previous: {:#}", e),
        }

        let mut stopped = stop.stopped.lock();
        if !*stopped {
            let _ = stop.signal.wait_for(&mut stopped, period);
        }
        if *stopped {
            break;
        }
    }
}

fn fetch(client: &reqwest::blocking::Client, config: &WeatherConfig) -> anyhow::Result<WeatherReading> {
    let response = client
        .get(&config.endpoint)
        .query(&[
            ("lat", config.latitude.to_string()),
            ("lon", config.longitude.to_string()),
            ("units", "metric".to_owned()),
            ("APPID", config.api_key.clone()),
        ])
        .send()
        .context("weather request")?;
    let status = response.status();
    if !status.is_success() {
        bail!("weather service returned {}", status);
    }
    let body = response.text().context("weather body")?;
    parse_current(&body)
}
