//! Bring-up of the CoreS3 peripherals the monitor needs
//!
//! The I2C bus is shared by the power management IC and the GPIO expander.
//! Both must be configured before the display panel is powered.

use axp2101_embedded::{AsyncAxp2101, ChargeLedMode};
use embassy_sync::mutex::Mutex;
use esp_hal::Async;
use esp_hal::i2c::master::{Config as I2cConfig, ConfigError as I2cConfigError, I2c};
use esp_hal::peripherals::{GPIO11, GPIO12, GPIO17, GPIO18, I2C0, UART1};
use esp_hal::time::Rate;
use esp_hal::uart::{Config as UartConfig, ConfigError as UartConfigError, Uart};
use log::{error, info, warn};
use static_cell::StaticCell;
use thiserror_no_std::Error;
use van_core::config::GPS_BAUD_RATE;

use crate::shared_i2c::{BusDevice, SharedBus};

pub type I2cBus = I2c<'static, Async>;
pub type I2cDevice = BusDevice<'static, I2cBus>;

/// GPIO expander address on the CoreS3 internal bus
const AW9523_ADDRESS: u8 = 0x58;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("I2C bus configuration rejected: {0:?}")]
    I2c(I2cConfigError),
    #[error("GPS UART configuration rejected: {0:?}")]
    Uart(UartConfigError),
}

/// Internal I2C bus at 400 kHz, SDA on GPIO12 and SCL on GPIO11
pub fn create_i2c_bus(
    i2c0: I2C0<'static>,
    sda: GPIO12<'static>,
    scl: GPIO11<'static>,
) -> Result<&'static SharedBus<I2cBus>, BoardError> {
    static I2C0_BUS: StaticCell<SharedBus<I2cBus>> = StaticCell::new();

    let bus = I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(400)))
        .map_err(BoardError::I2c)?
        .with_sda(sda)
        .with_scl(scl)
        .into_async();
    Ok(I2C0_BUS.init(Mutex::new(bus)))
}

/// UART to the positioning receiver on the Port C header
pub fn create_gps_uart(
    uart1: UART1<'static>,
    tx: GPIO17<'static>,
    rx: GPIO18<'static>,
) -> Result<Uart<'static, Async>, BoardError> {
    let config = UartConfig::default().with_baudrate(GPS_BAUD_RATE);
    let uart = Uart::new(uart1, config)
        .map_err(BoardError::Uart)?
        .with_tx(tx)
        .with_rx(rx)
        .into_async();
    Ok(uart)
}

/// Enable the power rails and the GPIO expander.
///
/// Failures are logged and bring-up continues; a dark screen is easier to
/// diagnose over RTT than a panic loop.
pub async fn init_power_rails(bus: &'static SharedBus<I2cBus>) {
    info!("Configuring power management");
    let mut pmu = AsyncAxp2101::new(BusDevice::new(bus));

    match pmu.init().await {
        Ok(_) => info!("Power management ready"),
        Err(e) => error!("Power management init failed: {:?}", e),
    }

    let rails = async {
        pmu.set_charging_led_mode(ChargeLedMode::On).await?;
        pmu.enable_aldo1().await?;
        pmu.enable_aldo2().await?;
        pmu.enable_aldo3().await?;
        pmu.enable_aldo4().await?;
        pmu.enable_bldo1().await?;
        pmu.enable_bldo2().await?;
        pmu.enable_dldo1().await?;
        // Display panel supply, millivolts
        pmu.set_aldo4_voltage(3300).await
    };
    if let Err(e) = rails.await {
        error!("Power rail setup failed: {:?}", e);
    }

    info!("Configuring GPIO expander");
    let mut expander = aw9523_embedded::r#async::Aw9523Async::new(BusDevice::new(bus), AW9523_ADDRESS);
    match expander.init().await {
        Ok(_) => info!("GPIO expander ready"),
        Err(e) => warn!("GPIO expander init failed: {:?}", e),
    }
}
