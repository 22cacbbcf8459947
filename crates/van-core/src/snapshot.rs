//! The aggregate state handed to the renderer

use embassy_time::Instant;

use crate::battery::BatteryState;
use crate::connectivity::ConnectivityStatus;
use crate::fix::PositionFix;
use crate::proximity::ProximityState;

/// Everything shown on screen, rebuilt from scratch each sampling cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSnapshot {
    pub fix: PositionFix,
    /// No position sentence accepted within the staleness threshold
    pub gps_stale: bool,
    pub proximity: ProximityState,
    /// `None` until the first successful battery read
    pub battery: Option<BatteryState>,
    pub connectivity: ConnectivityStatus,
    pub taken_at: Instant,
}

impl SystemSnapshot {
    /// Before the first sampling cycle: nothing known yet
    pub const fn initial(now: Instant) -> Self {
        Self {
            fix: PositionFix::unknown(),
            gps_stale: true,
            proximity: ProximityState::UNKNOWN,
            battery: None,
            connectivity: ConnectivityStatus::Disconnected,
            taken_at: now,
        }
    }

    /// External power doubles as the ignition signal
    pub fn engine_on(&self) -> Option<bool> {
        self.battery.map(|b| b.usb_connected)
    }
}
