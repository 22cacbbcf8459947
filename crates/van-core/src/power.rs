//! Engine power tracking
//!
//! The van's ignition feeds USB power. Losing it means the engine stopped;
//! after a grace period the device asks to shut down.

use embassy_time::{Duration, Instant};
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    EngineStarted,
    EngineStopped,
    /// Engine has been off for longer than the configured delay. Reported
    /// once per engine-off period.
    ShutdownDue,
}

#[derive(Debug, Clone)]
pub struct PowerTracker {
    engine_on: Option<bool>,
    off_since: Option<Instant>,
    delay: Duration,
    shutdown_reported: bool,
}

impl PowerTracker {
    pub const fn new(delay: Duration) -> Self {
        Self {
            engine_on: None,
            off_since: None,
            delay,
            shutdown_reported: false,
        }
    }

    /// Last observed engine state, `None` before the first reading
    pub const fn engine_on(&self) -> Option<bool> {
        self.engine_on
    }

    /// Feed the latest external power flag.
    ///
    /// Booting with the engine already off starts the shutdown timer at the
    /// first reading, without an `EngineStopped` event.
    pub fn update(&mut self, engine_on: bool, now: Instant) -> Option<PowerEvent> {
        let previous = self.engine_on.replace(engine_on);

        if engine_on {
            self.off_since = None;
            self.shutdown_reported = false;
            return match previous {
                Some(false) => {
                    info!("Engine started");
                    Some(PowerEvent::EngineStarted)
                }
                _ => None,
            };
        }

        let off_since = *self.off_since.get_or_insert(now);
        if previous == Some(true) {
            info!("Engine stopped, shutdown in {} s", self.delay.as_secs());
            return Some(PowerEvent::EngineStopped);
        }

        if !self.shutdown_reported && now.saturating_duration_since(off_since) > self.delay {
            self.shutdown_reported = true;
            info!("Engine off for over {} s", self.delay.as_secs());
            return Some(PowerEvent::ShutdownDue);
        }
        None
    }
}
