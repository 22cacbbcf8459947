//! Battery readout and power key over raw AXP2101 registers

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;
use log::{info, warn};
use van_core::BatteryReadout;
use van_core::battery::{BatteryReading, ChargeState};

use crate::board::I2cDevice;

/// Raised by the power key or by anything else that wants the monitor loop
/// to stop and the device to sleep
pub static SHUTDOWN: Signal<CriticalSectionRawMutex, ()> = Signal::new();

const AXP2101_ADDRESS: u8 = 0x34;

// ============================================================================
// Registers
// ============================================================================

const REG_STATUS1: u8 = 0x00;
const REG_STATUS2: u8 = 0x01;
const REG_ADC_ENABLE: u8 = 0x30;
const REG_VBAT_HIGH: u8 = 0x34;
const REG_IRQ_ENABLE1: u8 = 0x41;
const REG_IRQ_STATUS1: u8 = 0x49;

const STATUS1_VBUS_GOOD: u8 = 1 << 5;
const ADC_ENABLE_VBAT: u8 = 1 << 0;
const IRQ_PKEY_SHORT: u8 = 1 << 3;

const POWER_KEY_POLL: Duration = Duration::from_millis(200);

async fn read_register<I: I2c>(i2c: &mut I, register: u8) -> Result<u8, I::Error> {
    let mut value = [0u8; 1];
    i2c.write_read(AXP2101_ADDRESS, &[register], &mut value).await?;
    Ok(value[0])
}

async fn set_bits<I: I2c>(i2c: &mut I, register: u8, bits: u8) -> Result<(), I::Error> {
    let value = read_register(i2c, register).await?;
    i2c.write(AXP2101_ADDRESS, &[register, value | bits]).await
}

/// Decode the status registers and the 14-bit battery voltage
fn decode(status1: u8, status2: u8, vbat: [u8; 2]) -> BatteryReading {
    let millivolts = (u16::from(vbat[0] & 0x3F) << 8) | u16::from(vbat[1]);
    BatteryReading {
        voltage: f32::from(millivolts) / 1000.0,
        // 0b01 charging, 0b10 discharging, 0b00 standby
        charging: (status2 >> 5) & 0x03 == 0x01,
        usb_present: status1 & STATUS1_VBUS_GOOD != 0,
        charge_state: ChargeState::from_status_bits(status2),
    }
}

/// [`BatteryReadout`] backed by the AXP2101 fuel gauge ADC
pub struct AxpBattery<I> {
    i2c: I,
}

impl<I: I2c> AxpBattery<I> {
    pub const fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Voltage reads return zero until the battery ADC channel is on
    pub async fn enable_adc(&mut self) -> Result<(), I::Error> {
        set_bits(&mut self.i2c, REG_ADC_ENABLE, ADC_ENABLE_VBAT).await
    }
}

impl<I: I2c> BatteryReadout for AxpBattery<I> {
    type Error = I::Error;

    async fn read_battery(&mut self) -> Result<BatteryReading, Self::Error> {
        let status1 = read_register(&mut self.i2c, REG_STATUS1).await?;
        let status2 = read_register(&mut self.i2c, REG_STATUS2).await?;
        let mut vbat = [0u8; 2];
        self.i2c
            .write_read(AXP2101_ADDRESS, &[REG_VBAT_HIGH], &mut vbat)
            .await?;
        Ok(decode(status1, status2, vbat))
    }
}

/// Polls the short-press interrupt flag and raises [`SHUTDOWN`]
#[embassy_executor::task]
pub async fn power_key_task(mut i2c: I2cDevice) {
    if let Err(e) = set_bits(&mut i2c, REG_IRQ_ENABLE1, IRQ_PKEY_SHORT).await {
        warn!("Power key interrupt unavailable: {:?}", e);
        return;
    }

    loop {
        Timer::after(POWER_KEY_POLL).await;
        match read_register(&mut i2c, REG_IRQ_STATUS1).await {
            Ok(status) if status & IRQ_PKEY_SHORT != 0 => {
                // Write-one-to-clear
                if let Err(e) = i2c.write(AXP2101_ADDRESS, &[REG_IRQ_STATUS1, IRQ_PKEY_SHORT]).await {
                    warn!("Failed to clear power key flag: {:?}", e);
                }
                info!("Power key pressed");
                SHUTDOWN.signal(());
            }
            Ok(_) => {}
            Err(e) => warn!("Power key poll failed: {:?}", e),
        }
    }
}
