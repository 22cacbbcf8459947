//! ESP32-S3 firmware modules for van-monitor
//!
//! Hardware glue for the M5Stack CoreS3: the UART positioning receiver, the
//! AXP2101 battery readout and power key, the Wi-Fi link and the build-time
//! settings. Everything with logic in it lives in `van-core`.

#![no_std]

extern crate alloc;

pub mod board;
pub mod gps;
pub mod power;
pub mod settings;
pub mod shared_i2c;
pub mod wifi;
