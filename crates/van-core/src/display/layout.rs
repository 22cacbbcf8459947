//! Fixed slot layout of the 320x240 status screen

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

pub const DISPLAY_WIDTH: u16 = 320;
pub const DISPLAY_HEIGHT: u16 = 240;

pub const FONT: &MonoFont<'static> = &FONT_6X10;

/// Row height of every slot, a little taller than the glyphs
pub const SLOT_HEIGHT: u32 = 12;

/// One independently redrawn region of the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Title,
    GpsLabel,
    GpsStatus,
    HomeLabel,
    HomeStatus,
    Distance,
    Latitude,
    Longitude,
    Speed,
    BatteryLabel,
    BatteryPercent,
    ChargeState,
    UsbLabel,
    Usb,
    EngineLabel,
    Engine,
    WifiLabel,
    Wifi,
    Time,
}

pub const SLOT_COUNT: usize = 19;

/// Where a slot lives and how many characters it can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub origin: Point,
    pub max_chars: u32,
}

impl SlotSpec {
    const fn at(x: i32, y: i32, max_chars: u32) -> Self {
        Self {
            origin: Point::new(x, y),
            max_chars,
        }
    }

    /// Area cleared before the slot is redrawn
    pub fn bounds(&self) -> Rectangle {
        let glyph = FONT.character_size.width + FONT.character_spacing;
        Rectangle::new(self.origin, Size::new(glyph * self.max_chars, SLOT_HEIGHT))
    }
}

impl Slot {
    /// Every slot, in draw order
    pub const ALL: [Slot; SLOT_COUNT] = [
        Slot::Title,
        Slot::GpsLabel,
        Slot::GpsStatus,
        Slot::HomeLabel,
        Slot::HomeStatus,
        Slot::Distance,
        Slot::Latitude,
        Slot::Longitude,
        Slot::Speed,
        Slot::BatteryLabel,
        Slot::BatteryPercent,
        Slot::ChargeState,
        Slot::UsbLabel,
        Slot::Usb,
        Slot::EngineLabel,
        Slot::Engine,
        Slot::WifiLabel,
        Slot::Wifi,
        Slot::Time,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn spec(self) -> SlotSpec {
        match self {
            Slot::Title => SlotSpec::at(10, 10, 20),
            Slot::GpsLabel => SlotSpec::at(10, 40, 4),
            Slot::GpsStatus => SlotSpec::at(55, 40, 20),
            Slot::HomeLabel => SlotSpec::at(180, 40, 5),
            Slot::HomeStatus => SlotSpec::at(225, 40, 12),
            Slot::Distance => SlotSpec::at(180, 60, 20),
            Slot::Latitude => SlotSpec::at(10, 60, 16),
            Slot::Longitude => SlotSpec::at(10, 80, 16),
            Slot::Speed => SlotSpec::at(10, 100, 24),
            Slot::BatteryLabel => SlotSpec::at(10, 120, 8),
            Slot::BatteryPercent => SlotSpec::at(85, 120, 6),
            Slot::ChargeState => SlotSpec::at(10, 140, 28),
            Slot::UsbLabel => SlotSpec::at(10, 160, 4),
            Slot::Usb => SlotSpec::at(50, 160, 12),
            Slot::EngineLabel => SlotSpec::at(10, 180, 7),
            Slot::Engine => SlotSpec::at(75, 180, 6),
            Slot::WifiLabel => SlotSpec::at(10, 200, 5),
            Slot::Wifi => SlotSpec::at(60, 200, 12),
            Slot::Time => SlotSpec::at(10, 220, 16),
        }
    }

    /// Constant text that never changes after the first render
    pub const fn label(self) -> Option<&'static str> {
        match self {
            Slot::Title => Some("VAN MONITOR"),
            Slot::GpsLabel => Some("GPS:"),
            Slot::HomeLabel => Some("HOME:"),
            Slot::BatteryLabel => Some("BATTERY:"),
            Slot::UsbLabel => Some("USB:"),
            Slot::EngineLabel => Some("ENGINE:"),
            Slot::WifiLabel => Some("WIFI:"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> Rectangle {
        Rectangle::new(
            Point::zero(),
            Size::new(DISPLAY_WIDTH as u32, DISPLAY_HEIGHT as u32),
        )
    }

    #[test]
    fn test_all_is_in_index_order() {
        for (i, slot) in Slot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }

    #[test]
    fn test_slots_fit_on_screen() {
        let screen = screen();
        for slot in Slot::ALL {
            let bounds = slot.spec().bounds();
            assert!(
                screen.contains(bounds.top_left) && screen.contains(bounds.bottom_right().unwrap()),
                "{:?} leaves the screen",
                slot
            );
        }
    }

    #[test]
    fn test_slots_do_not_overlap() {
        for a in Slot::ALL {
            for b in Slot::ALL {
                if a == b {
                    continue;
                }
                let overlap = a.spec().bounds().intersection(&b.spec().bounds());
                assert!(overlap.is_zero_sized(), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_labels_fit_their_slots() {
        for slot in Slot::ALL {
            if let Some(label) = slot.label() {
                assert!(label.len() as u32 <= slot.spec().max_chars, "{:?}", slot);
            }
        }
    }
}
