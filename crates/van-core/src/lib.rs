//! Hardware-independent core library for van-monitor
//!
//! This crate contains all platform-agnostic logic for the van monitor:
//! NMEA sentence parsing, fix aggregation, home proximity, battery
//! estimation, the incremental display reconciler and the monitor loop that
//! ties them together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod battery;
pub mod config;
pub mod connectivity;
pub mod display;
pub mod error;
pub mod fix;
pub mod geo;
pub mod monitor;
pub mod nmea;
pub mod power;
pub mod proximity;
pub mod snapshot;
pub mod telemetry;

pub use config::MonitorConfig;
pub use connectivity::{ConnectivityManager, ConnectivityStatus};
pub use display::{DisplayReconciler, DisplaySink, GraphicsSink};
pub use error::{ConfigError, ParseError, SampleError};
pub use monitor::{Diagnostics, LoopState, MonitorLoop, RunExit, TickReport};
pub use snapshot::SystemSnapshot;
pub use telemetry::{BatteryReadout, LineRead, TelemetrySource};
