//! Voltage-based battery estimation for a single Li-ion cell
//!
//! The percentage is a linear interpolation between the two documented
//! anchors, 3.0 V (empty) and 4.2 V (full). It is an approximation, not a
//! manufacturer-calibrated discharge curve.

/// Voltage reported as 0 %
pub const EMPTY_VOLTAGE: f32 = 3.0;

/// Voltage reported as 100 %
pub const FULL_VOLTAGE: f32 = 4.2;

/// Readings outside this window are treated as sensor noise. They are still
/// clamped and shown, only counted as out of range.
pub const PLAUSIBLE_VOLTAGE: (f32, f32) = (2.5, 4.5);

/// Above this the battery is healthy
pub const HEALTHY_ABOVE_PERCENT: u8 = 50;

/// Above this (and not healthy) the battery is low, otherwise critical
pub const LOW_ABOVE_PERCENT: u8 = 20;

const _: () = assert!(LOW_ABOVE_PERCENT < HEALTHY_ABOVE_PERCENT);

/// Charger state as reported by the power management IC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeState {
    Trickle,
    PreCharge,
    ConstantCurrent,
    ConstantVoltage,
    Done,
    NotCharging,
    #[default]
    Unknown,
}

impl ChargeState {
    /// Decode the low three bits of the AXP2101 charger status register
    pub const fn from_status_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::Trickle,
            1 => Self::PreCharge,
            2 => Self::ConstantCurrent,
            3 => Self::ConstantVoltage,
            4 => Self::Done,
            5 => Self::NotCharging,
            _ => Self::Unknown,
        }
    }

    pub const fn is_charging(self) -> bool {
        matches!(
            self,
            Self::Trickle | Self::PreCharge | Self::ConstantCurrent | Self::ConstantVoltage
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Trickle => "trickle",
            Self::PreCharge => "pre-charge",
            Self::ConstantCurrent => "const-current",
            Self::ConstantVoltage => "const-voltage",
            Self::Done => "done",
            Self::NotCharging => "not-charging",
            Self::Unknown => "unknown",
        }
    }
}

/// Raw values from the battery readout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    pub voltage: f32,
    pub charging: bool,
    pub usb_present: bool,
    pub charge_state: ChargeState,
}

/// Derived battery status shown on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    /// Always within 0..=100
    pub percent: u8,
    pub charging: bool,
    pub usb_connected: bool,
    pub voltage: f32,
    pub charge_state: ChargeState,
}

/// Qualitative level used for colouring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryBand {
    Healthy,
    Low,
    Critical,
}

impl BatteryState {
    pub const fn band(&self) -> BatteryBand {
        band_for(self.percent)
    }
}

pub const fn band_for(percent: u8) -> BatteryBand {
    if percent > HEALTHY_ABOVE_PERCENT {
        BatteryBand::Healthy
    } else if percent > LOW_ABOVE_PERCENT {
        BatteryBand::Low
    } else {
        BatteryBand::Critical
    }
}

/// Map a cell voltage to 0..=100. Never fails: NaN reads as empty and any
/// out-of-range value is clamped.
pub fn percent_from_voltage(voltage: f32) -> u8 {
    if voltage.is_nan() {
        return 0;
    }
    let ratio = (voltage - EMPTY_VOLTAGE) / (FULL_VOLTAGE - EMPTY_VOLTAGE);
    libm::roundf(ratio * 100.0).clamp(0.0, 100.0) as u8
}

pub fn is_plausible(voltage: f32) -> bool {
    let (low, high) = PLAUSIBLE_VOLTAGE;
    (low..=high).contains(&voltage)
}

/// Derive the displayed state. Flags pass through untouched.
pub fn estimate(reading: &BatteryReading) -> BatteryState {
    BatteryState {
        percent: percent_from_voltage(reading.voltage),
        charging: reading.charging,
        usb_connected: reading.usb_present,
        voltage: reading.voltage,
        charge_state: reading.charge_state,
    }
}
