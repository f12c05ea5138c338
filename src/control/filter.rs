//! Rolling temperature filter.
//!
//! Keeps the most recent raw samples in a fixed-capacity FIFO and derives
//! the *monitored* temperature from it: the 4th-smallest value in the
//! window (or the minimum while the window holds three samples or fewer).
//! Using a low order statistic instead of a mean biases control decisions
//! toward the coldest recent reading, so a single warm spike cannot hide
//! a frost risk.
//!
//! The capacity is exactly `interval / sampling period` and can shrink or
//! grow at runtime.  Samples live in a heap `VecDeque`, so a short
//! sampling period never truncates the window.

use std::collections::VecDeque;

use crate::desired::MAX_TELEMETRY_INTERVAL_SECS;

/// Largest window: the longest interval sampled every second.
pub const MAX_WINDOW: usize = MAX_TELEMETRY_INTERVAL_SECS as usize;

/// Index into the sorted window used once it holds more than 3 samples.
const MONITOR_RANK: usize = 3;

/// One filtered reading, both values rounded to 0.1 degC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredReading {
    pub raw: f32,
    pub monitored: f32,
}

/// Bounded FIFO of raw samples with a low-percentile output.
pub struct TemperatureFilter {
    window: VecDeque<f32>,
    capacity: usize,
}

impl TemperatureFilter {
    /// Create an empty filter.  `capacity` is clamped to `1..=MAX_WINDOW`.
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::new(),
            capacity: clamp_capacity(capacity),
        }
    }

    /// Window capacity for a telemetry interval at a given sampling period.
    pub fn capacity_for(interval_secs: u32, sampling_secs: u32) -> usize {
        let sampling = sampling_secs.max(1);
        clamp_capacity((interval_secs / sampling) as usize)
    }

    /// Add a sample and return `(raw, monitored)`.
    pub fn ingest(&mut self, raw: f32) -> FilteredReading {
        while self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(raw);

        FilteredReading {
            raw: round_tenth(raw),
            monitored: round_tenth(self.monitored()),
        }
    }

    /// Change the capacity, dropping the oldest samples if it shrank.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = clamp_capacity(capacity);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Samples currently held, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.window.iter().copied()
    }

    /// Unrounded monitored temperature of the current window.
    fn monitored(&self) -> f32 {
        let mut sorted: Vec<f32> = self.window.iter().copied().collect();
        sorted.sort_unstable_by(f32::total_cmp);
        let rank = if sorted.len() > MONITOR_RANK {
            MONITOR_RANK
        } else {
            0
        };
        sorted.get(rank).copied().unwrap_or(f32::NAN)
    }
}

fn clamp_capacity(capacity: usize) -> usize {
    capacity.clamp(1, MAX_WINDOW)
}

/// Round to one decimal place.
pub fn round_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
