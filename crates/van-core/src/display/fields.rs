//! Turns a snapshot into the text and colour of every slot

use core::fmt::{self, Write};

use embedded_graphics::pixelcolor::Rgb565;

use super::colors::{self, GRAY, GREEN, RED, WHITE, YELLOW};
use super::layout::{SLOT_COUNT, Slot};
use crate::proximity::Proximity;
use crate::snapshot::SystemSnapshot;

pub type FieldText = heapless::String<32>;

/// What one slot shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub text: FieldText,
    pub color: Rgb565,
}

impl FieldValue {
    pub fn new(text: &str, color: Rgb565) -> Self {
        let mut value = Self {
            text: FieldText::new(),
            color,
        };
        push_truncated(&mut value.text, text);
        value
    }

    fn formatted(color: Rgb565, args: fmt::Arguments<'_>) -> Self {
        let mut text = Truncating(FieldText::new());
        // Truncating never reports an error
        let _ = text.write_fmt(args);
        Self {
            text: text.0,
            color,
        }
    }
}

/// Writer that silently drops what does not fit
struct Truncating(FieldText);

impl Write for Truncating {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        push_truncated(&mut self.0, s);
        Ok(())
    }
}

fn push_truncated(text: &mut FieldText, s: &str) {
    for c in s.chars() {
        if text.push(c).is_err() {
            break;
        }
    }
}

/// Every slot's value for `snapshot`, indexed by [`Slot::index`]
pub fn compose(snapshot: &SystemSnapshot) -> [FieldValue; SLOT_COUNT] {
    Slot::ALL.map(|slot| field_for(slot, snapshot))
}

/// Colour is a pure function of the value shown
pub fn field_for(slot: Slot, snapshot: &SystemSnapshot) -> FieldValue {
    if let Some(label) = slot.label() {
        return FieldValue::new(label, WHITE);
    }

    let fix = &snapshot.fix;
    // Coordinates are only shown as live while the receiver vouches for them
    let live = fix.fix_valid && !snapshot.gps_stale;

    match slot {
        Slot::GpsStatus => {
            if snapshot.gps_stale {
                FieldValue::new("NO DATA", YELLOW)
            } else if fix.fix_valid {
                FieldValue::formatted(GREEN, format_args!("FIX SAT:{}", fix.satellites))
            } else {
                FieldValue::new("NO FIX", RED)
            }
        }
        Slot::HomeStatus => {
            let proximity = snapshot.proximity.proximity;
            let text = match proximity {
                Proximity::Near => "YES",
                Proximity::Far => "NO",
                Proximity::Unknown => "?",
            };
            FieldValue::new(text, colors::proximity_color(proximity))
        }
        Slot::Distance => match snapshot.proximity.distance {
            Some(distance) => FieldValue::formatted(WHITE, format_args!("{}", distance)),
            None => FieldValue::new("--", GRAY),
        },
        Slot::Latitude => match fix.position {
            Some(p) => FieldValue::formatted(
                if live { WHITE } else { GRAY },
                format_args!("LAT: {:.4}", p.latitude),
            ),
            None => FieldValue::new("LAT: ---", GRAY),
        },
        Slot::Longitude => match fix.position {
            Some(p) => FieldValue::formatted(
                if live { WHITE } else { GRAY },
                format_args!("LON: {:.4}", p.longitude),
            ),
            None => FieldValue::new("LON: ---", GRAY),
        },
        Slot::Speed => {
            if live {
                FieldValue::formatted(WHITE, format_args!("SPEED: {:.1} km/h", fix.speed_kmh))
            } else {
                FieldValue::new("SPEED: --", GRAY)
            }
        }
        Slot::BatteryPercent => match snapshot.battery {
            Some(battery) => FieldValue::formatted(
                colors::battery_color(battery.band()),
                format_args!("{}%", battery.percent),
            ),
            None => FieldValue::new("--%", GRAY),
        },
        Slot::ChargeState => match snapshot.battery {
            Some(battery) => FieldValue::formatted(
                WHITE,
                format_args!("Status: {}", battery.charge_state.label()),
            ),
            None => FieldValue::new("Status: --", GRAY),
        },
        Slot::Usb => match snapshot.battery {
            Some(battery) => FieldValue::new(
                if battery.usb_connected { "CONNECTED" } else { "UNPLUGGED" },
                colors::flag_color(battery.usb_connected),
            ),
            None => FieldValue::new("--", GRAY),
        },
        Slot::Engine => match snapshot.engine_on() {
            Some(on) => FieldValue::new(if on { "ON" } else { "OFF" }, colors::flag_color(on)),
            None => FieldValue::new("--", GRAY),
        },
        Slot::Wifi => FieldValue::new(
            snapshot.connectivity.label(),
            colors::connectivity_color(snapshot.connectivity),
        ),
        Slot::Time => match fix.time {
            Some(time) => FieldValue::formatted(
                if snapshot.gps_stale { GRAY } else { WHITE },
                format_args!("TIME: {}", time),
            ),
            None => FieldValue::new("TIME: --:--:--", GRAY),
        },
        // Label slots returned above
        Slot::Title
        | Slot::GpsLabel
        | Slot::HomeLabel
        | Slot::BatteryLabel
        | Slot::UsbLabel
        | Slot::EngineLabel
        | Slot::WifiLabel => FieldValue::new("", WHITE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::{BatteryState, ChargeState};
    use crate::connectivity::ConnectivityStatus;
    use crate::geo::{Coordinate, Distance};
    use crate::nmea::TimeOfDay;
    use crate::proximity::ProximityState;
    use embassy_time::Instant;

    fn text(slot: Slot, snapshot: &SystemSnapshot) -> FieldValue {
        field_for(slot, snapshot)
    }

    fn live_snapshot() -> SystemSnapshot {
        let mut snapshot = SystemSnapshot::initial(Instant::from_secs(0));
        snapshot.gps_stale = false;
        snapshot.fix.fix_valid = true;
        snapshot.fix.position = Some(Coordinate::new(48.1173, 11.516_666));
        snapshot.fix.satellites = 8;
        snapshot.fix.speed_kmh = 41.4848;
        snapshot.fix.time = Some(TimeOfDay::new(12, 35, 19));
        snapshot.proximity = ProximityState {
            proximity: Proximity::Far,
            distance: Some(Distance::feet(1234.4)),
        };
        snapshot.battery = Some(BatteryState {
            percent: 87,
            charging: true,
            usb_connected: true,
            voltage: 4.04,
            charge_state: ChargeState::ConstantCurrent,
        });
        snapshot.connectivity = ConnectivityStatus::Connecting;
        snapshot
    }

    #[test]
    fn test_initial_snapshot_shows_placeholders() {
        let snapshot = SystemSnapshot::initial(Instant::from_secs(0));
        assert_eq!(text(Slot::GpsStatus, &snapshot), FieldValue::new("NO DATA", YELLOW));
        assert_eq!(text(Slot::HomeStatus, &snapshot), FieldValue::new("?", YELLOW));
        assert_eq!(text(Slot::Distance, &snapshot), FieldValue::new("--", GRAY));
        assert_eq!(text(Slot::Latitude, &snapshot), FieldValue::new("LAT: ---", GRAY));
        assert_eq!(text(Slot::BatteryPercent, &snapshot), FieldValue::new("--%", GRAY));
        assert_eq!(text(Slot::Engine, &snapshot), FieldValue::new("--", GRAY));
        assert_eq!(text(Slot::Wifi, &snapshot), FieldValue::new("OFF", RED));
        assert_eq!(
            text(Slot::Time, &snapshot),
            FieldValue::new("TIME: --:--:--", GRAY)
        );
    }

    #[test]
    fn test_live_snapshot_values() {
        let snapshot = live_snapshot();
        assert_eq!(text(Slot::Title, &snapshot), FieldValue::new("VAN MONITOR", WHITE));
        assert_eq!(text(Slot::GpsStatus, &snapshot), FieldValue::new("FIX SAT:8", GREEN));
        assert_eq!(text(Slot::HomeStatus, &snapshot), FieldValue::new("NO", RED));
        assert_eq!(text(Slot::Distance, &snapshot), FieldValue::new("1234 ft", WHITE));
        assert_eq!(text(Slot::Latitude, &snapshot), FieldValue::new("LAT: 48.1173", WHITE));
        assert_eq!(text(Slot::Longitude, &snapshot), FieldValue::new("LON: 11.5167", WHITE));
        assert_eq!(
            text(Slot::Speed, &snapshot),
            FieldValue::new("SPEED: 41.5 km/h", WHITE)
        );
        assert_eq!(text(Slot::BatteryPercent, &snapshot), FieldValue::new("87%", GREEN));
        assert_eq!(
            text(Slot::ChargeState, &snapshot),
            FieldValue::new("Status: const-current", WHITE)
        );
        assert_eq!(text(Slot::Usb, &snapshot), FieldValue::new("CONNECTED", GREEN));
        assert_eq!(text(Slot::Engine, &snapshot), FieldValue::new("ON", GREEN));
        assert_eq!(text(Slot::Wifi, &snapshot), FieldValue::new("CONNECTING", YELLOW));
        assert_eq!(text(Slot::Time, &snapshot), FieldValue::new("TIME: 12:35:19", WHITE));
    }

    #[test]
    fn test_stale_position_is_grayed_not_hidden() {
        let mut snapshot = live_snapshot();
        snapshot.gps_stale = true;
        assert_eq!(text(Slot::GpsStatus, &snapshot), FieldValue::new("NO DATA", YELLOW));
        assert_eq!(text(Slot::Latitude, &snapshot), FieldValue::new("LAT: 48.1173", GRAY));
        assert_eq!(text(Slot::Speed, &snapshot), FieldValue::new("SPEED: --", GRAY));
        assert_eq!(text(Slot::Time, &snapshot), FieldValue::new("TIME: 12:35:19", GRAY));
    }

    #[test]
    fn test_lost_fix_reads_no_fix() {
        let mut snapshot = live_snapshot();
        snapshot.fix.fix_valid = false;
        assert_eq!(text(Slot::GpsStatus, &snapshot), FieldValue::new("NO FIX", RED));
        assert_eq!(text(Slot::Longitude, &snapshot).color, GRAY);
    }

    #[test]
    fn test_battery_colour_bands() {
        let mut snapshot = live_snapshot();
        for (percent, color) in [(51, GREEN), (50, YELLOW), (21, YELLOW), (20, RED), (0, RED)] {
            if let Some(battery) = snapshot.battery.as_mut() {
                battery.percent = percent;
            }
            assert_eq!(text(Slot::BatteryPercent, &snapshot).color, color, "{}%", percent);
        }
    }

    #[test]
    fn test_long_text_is_truncated() {
        let value = FieldValue::new("0123456789012345678901234567890123456789", WHITE);
        assert_eq!(value.text.len(), 32);
    }
}
