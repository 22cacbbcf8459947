//! RGB565 palette for the status screen
//!
//! - Red: 5 bits (0-31)
//! - Green: 6 bits (0-63)
//! - Blue: 5 bits (0-31)

use embedded_graphics::pixelcolor::Rgb565;

use crate::battery::BatteryBand;
use crate::connectivity::ConnectivityStatus;
use crate::proximity::Proximity;

// ============================================================================
// Base Colors
// ============================================================================

pub const BACKGROUND: Rgb565 = Rgb565::new(0, 0, 0);

/// Labels and live values
pub const WHITE: Rgb565 = Rgb565::new(31, 63, 31);

/// Stale or unknown values
pub const GRAY: Rgb565 = Rgb565::new(16, 32, 16);

// ============================================================================
// Status Colors
// ============================================================================

/// 0x07E0
pub const GREEN: Rgb565 = Rgb565::new(0, 63, 0);

/// 0xFFE0
pub const YELLOW: Rgb565 = Rgb565::new(31, 63, 0);

/// 0xF800
pub const RED: Rgb565 = Rgb565::new(31, 0, 0);

pub const fn battery_color(band: BatteryBand) -> Rgb565 {
    match band {
        BatteryBand::Healthy => GREEN,
        BatteryBand::Low => YELLOW,
        BatteryBand::Critical => RED,
    }
}

pub const fn proximity_color(proximity: Proximity) -> Rgb565 {
    match proximity {
        Proximity::Near => GREEN,
        Proximity::Far => RED,
        Proximity::Unknown => YELLOW,
    }
}

pub const fn connectivity_color(status: ConnectivityStatus) -> Rgb565 {
    match status {
        ConnectivityStatus::Connected => GREEN,
        ConnectivityStatus::Connecting => YELLOW,
        ConnectivityStatus::Disconnected => RED,
    }
}

/// Green for a healthy on state, red otherwise
pub const fn flag_color(on: bool) -> Rgb565 {
    if on { GREEN } else { RED }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::raw::RawU16;
    use embedded_graphics::prelude::*;

    #[test]
    fn test_status_colors_match_panel_values() {
        assert_eq!(RawU16::from(GREEN).into_inner(), 0x07E0);
        assert_eq!(RawU16::from(RED).into_inner(), 0xF800);
        assert_eq!(RawU16::from(YELLOW).into_inner(), 0xFFE0);
        assert_eq!(RawU16::from(WHITE).into_inner(), 0xFFFF);
        assert_eq!(RawU16::from(BACKGROUND).into_inner(), 0x0000);
    }
}
