//! Startup configuration for the monitor loop
//!
//! Built once at boot and never mutated. Defaults match the van this was
//! written for; firmware and simulator override the home coordinate.

use embassy_time::Duration;

use crate::error::ConfigError;
use crate::geo::{Coordinate, Distance};

pub const DEFAULT_HOME: Coordinate = Coordinate::new(40.7128, -74.0060);
pub const DEFAULT_HOME_RADIUS: Distance = Distance::feet(2000.0);

/// UART baud rate of the positioning receiver
pub const GPS_BAUD_RATE: u32 = 115_200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    pub home: Coordinate,
    pub home_radius: Distance,
    /// How often telemetry is read and a fresh snapshot published
    pub sample_interval: Duration,
    /// How often the display is reconciled with the latest snapshot
    pub render_interval: Duration,
    /// No accepted sentence for this long marks the fix stale
    pub stale_after: Duration,
    /// Longest wait for a single line from the receiver
    pub gps_line_timeout: Duration,
    /// Upper bound on lines consumed per sampling cycle
    pub gps_max_lines_per_sample: u16,
    /// Agreeing readings needed before a proximity change is reported
    pub proximity_debounce_samples: u8,
    /// Engine off for longer than this requests a shutdown
    pub shutdown_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            home: DEFAULT_HOME,
            home_radius: DEFAULT_HOME_RADIUS,
            sample_interval: Duration::from_millis(5_000),
            render_interval: Duration::from_millis(250),
            stale_after: Duration::from_secs(30),
            gps_line_timeout: Duration::from_millis(3_000),
            gps_max_lines_per_sample: 32,
            proximity_debounce_samples: 2,
            shutdown_delay: Duration::from_secs(30),
        }
    }
}

impl MonitorConfig {
    pub fn with_home(mut self, home: Coordinate) -> Self {
        self.home = home;
        self
    }

    pub fn with_home_radius(mut self, radius: Distance) -> Self {
        self.home_radius = radius;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_render_interval(mut self, interval: Duration) -> Self {
        self.render_interval = interval;
        self
    }

    pub fn with_stale_after(mut self, max_age: Duration) -> Self {
        self.stale_after = max_age;
        self
    }

    pub fn with_gps_line_timeout(mut self, timeout: Duration) -> Self {
        self.gps_line_timeout = timeout;
        self
    }

    pub fn with_proximity_debounce(mut self, samples: u8) -> Self {
        self.proximity_debounce_samples = samples;
        self
    }

    pub fn with_shutdown_delay(mut self, delay: Duration) -> Self {
        self.shutdown_delay = delay;
        self
    }

    /// Check the invariants the loop relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, interval) in [
            ("sample", self.sample_interval),
            ("render", self.render_interval),
            ("staleness", self.stale_after),
            ("GPS line timeout", self.gps_line_timeout),
        ] {
            if interval.as_ticks() == 0 {
                return Err(ConfigError::ZeroInterval(name));
            }
        }
        // Rendering only ever consumes the snapshot sampling produces
        if self.sample_interval < self.render_interval {
            return Err(ConfigError::RenderSlowerThanSampling);
        }
        if !(self.home_radius.value > 0.0) {
            return Err(ConfigError::NonPositiveRadius);
        }
        if !self.home.is_valid() {
            return Err(ConfigError::HomeOutOfRange);
        }
        Ok(())
    }
}
