//! Desktop simulator for the van monitor.
//!
//! Replays an NMEA capture through `van-core`'s [`MonitorLoop`] on a virtual
//! clock, with a scripted battery and a pretend Wi-Fi link. The screen is
//! rendered into an offscreen `embedded-graphics-simulator` display and every
//! sampling cycle that changed it is written out as a PNG.
//!
//! ```text
//! van-simulator [CAPTURE] [OUTPUT_DIR]
//! ```
//!
//! `VAN_HOME_LAT`, `VAN_HOME_LON` and `VAN_HOME_RADIUS_FT` (environment or
//! `.env`) override the home location. `RUST_LOG` controls verbosity.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use embassy_futures::block_on;
use embassy_time::{Duration, Instant};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay};
use log::{error, info, warn};

use van_core::battery::{BatteryReading, ChargeState, FULL_VOLTAGE};
use van_core::display::colors::YELLOW;
use van_core::display::layout::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use van_core::geo::{Coordinate, Distance};
use van_core::proximity::Proximity;
use van_core::telemetry::LineAssembler;
use van_core::{
    BatteryReadout, ConnectivityManager, ConnectivityStatus, GraphicsSink, LineRead, MonitorConfig,
    MonitorLoop, TelemetrySource,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the written frames.
const FRAME_SCALE: u32 = 2;

const DEFAULT_CAPTURE: &str = "crates/van-simulator/data/drive.nmea";
const DEFAULT_OUTPUT_DIR: &str = "target/van-simulator";

/// Battery drain per sampling cycle, in volts.
const DRAIN_PER_SAMPLE: f32 = 0.004;

/// Sampling cycles a pretend Wi-Fi association takes.
const WIFI_ASSOCIATION_CYCLES: u8 = 2;

/// Stop even if the engine never turns off.
const MAX_VIRTUAL_RUNTIME: Duration = Duration::from_secs(30 * 60);

// ---------------------------------------------------------------------------
// Telemetry replay
// ---------------------------------------------------------------------------

/// Feeds a capture file through the same line assembler the UART uses.
/// Once the capture is exhausted every read times out, as a receiver that
/// lost power would.
struct ReplaySource {
    bytes: Vec<u8>,
    cursor: usize,
    assembler: LineAssembler,
}

impl ReplaySource {
    fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            cursor: 0,
            assembler: LineAssembler::new(),
        }
    }

    fn exhausted(&self) -> bool {
        self.cursor >= self.bytes.len()
    }
}

impl TelemetrySource for ReplaySource {
    type Error = Infallible;

    async fn read_line(&mut self, _timeout: Duration) -> Result<LineRead, Infallible> {
        while let Some(&byte) = self.bytes.get(self.cursor) {
            self.cursor += 1;
            if let Some(line) = self.assembler.push(byte) {
                return Ok(LineRead::Line(line));
            }
        }
        Ok(LineRead::Timeout)
    }
}

// ---------------------------------------------------------------------------
// Battery and engine
// ---------------------------------------------------------------------------

/// Slowly discharging cell. The engine (USB power) stays on while the
/// capture lasts.
struct ScriptedBattery {
    voltage: f32,
    engine_on: bool,
}

impl ScriptedBattery {
    fn new() -> Self {
        Self {
            voltage: FULL_VOLTAGE - 0.1,
            engine_on: true,
        }
    }
}

impl BatteryReadout for ScriptedBattery {
    type Error = Infallible;

    async fn read_battery(&mut self) -> Result<BatteryReading, Infallible> {
        let charge_state = if !self.engine_on {
            self.voltage -= DRAIN_PER_SAMPLE;
            ChargeState::NotCharging
        } else if self.voltage < FULL_VOLTAGE {
            self.voltage += DRAIN_PER_SAMPLE / 2.0;
            ChargeState::ConstantCurrent
        } else {
            ChargeState::Done
        };

        Ok(BatteryReading {
            voltage: self.voltage,
            charging: charge_state.is_charging(),
            usb_present: self.engine_on,
            charge_state,
        })
    }
}

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

/// Pretend Wi-Fi that associates a couple of cycles after arriving home.
#[derive(Default)]
struct SimulatedWifi {
    status: ConnectivityStatus,
    cycles_until_connected: u8,
}

impl SimulatedWifi {
    /// Advance the pretend association by one sampling cycle.
    fn step(&mut self) {
        if self.status != ConnectivityStatus::Connecting {
            return;
        }
        self.cycles_until_connected = self.cycles_until_connected.saturating_sub(1);
        if self.cycles_until_connected == 0 {
            info!("Wi-Fi connected");
            self.status = ConnectivityStatus::Connected;
        }
    }
}

impl ConnectivityManager for SimulatedWifi {
    fn on_proximity_changed(&mut self, proximity: Proximity) {
        match proximity {
            Proximity::Near => {
                info!("Near home, connecting Wi-Fi");
                self.status = ConnectivityStatus::Connecting;
                self.cycles_until_connected = WIFI_ASSOCIATION_CYCLES;
            }
            Proximity::Far | Proximity::Unknown => {
                info!("Left home, Wi-Fi off");
                self.status = ConnectivityStatus::Disconnected;
            }
        }
    }

    fn status(&self) -> ConnectivityStatus {
        self.status
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn env_number(name: &str) -> Option<f64> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(number) => Some(number),
        Err(_) => {
            warn!("Ignoring {}={:?}, not a number", name, value);
            None
        }
    }
}

fn config_from_env() -> MonitorConfig {
    if let Err(e) = dotenvy::dotenv() {
        info!("No .env loaded ({})", e);
    }

    let mut config = MonitorConfig::default();
    if let (Some(latitude), Some(longitude)) = (env_number("VAN_HOME_LAT"), env_number("VAN_HOME_LON"))
    {
        config = config.with_home(Coordinate::new(latitude, longitude));
    }
    if let Some(feet) = env_number("VAN_HOME_RADIUS_FT") {
        config = config.with_home_radius(Distance::feet(feet));
    }
    config
}

// ---------------------------------------------------------------------------
// Frame output
// ---------------------------------------------------------------------------

fn save_frame(display: &SimulatorDisplay<Rgb565>, dir: &Path, name: &str) {
    let settings = OutputSettingsBuilder::new().scale(FRAME_SCALE).build();
    let path = dir.join(name);
    match display.to_rgb_output_image(&settings).save_png(&path) {
        Ok(()) => info!("Wrote {}", path.display()),
        Err(e) => error!("Failed to write {}: {}", path.display(), e),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting van-monitor simulator");

    let mut args = std::env::args().skip(1);
    let capture = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_CAPTURE.into()));
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_OUTPUT_DIR.into()));

    let telemetry = match ReplaySource::from_file(&capture) {
        Ok(source) => source,
        Err(e) => {
            error!("Cannot read capture {}: {}", capture.display(), e);
            std::process::exit(1);
        }
    };
    if let Err(e) = std::fs::create_dir_all(&output_dir) {
        error!("Cannot create {}: {}", output_dir.display(), e);
        std::process::exit(1);
    }

    let display = SimulatorDisplay::<Rgb565>::new(Size::new(
        DISPLAY_WIDTH as u32,
        DISPLAY_HEIGHT as u32,
    ));
    let mut sink = GraphicsSink::new(display);

    // Virtual clock: jump straight to each deadline instead of sleeping
    let start = Instant::from_secs(0);
    let mut monitor = match MonitorLoop::new(
        config_from_env(),
        telemetry,
        ScriptedBattery::new(),
        SimulatedWifi::default(),
        start,
    ) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut now = start;
    let mut frame = 0u32;
    let mut engine_on = true;
    loop {
        let report = block_on(monitor.tick(now, &mut sink));

        if report.sampled {
            monitor.connectivity_mut().step();
            if report.draw_ops > 0 {
                save_frame(sink.display(), &output_dir, &format!("frame-{:04}.png", frame));
                frame += 1;
            }
        }

        if report.shutdown_due() {
            info!("Engine off too long, shutting down");
            if let Err(e) = sink.show_message("SHUTTING DOWN", YELLOW) {
                error!("Display error: {:?}", e);
            }
            save_frame(sink.display(), &output_dir, "shutdown.png");
            break;
        }

        // Turn the engine off once the drive is over
        if engine_on && monitor.telemetry().exhausted() {
            info!("Capture finished, engine off");
            engine_on = false;
            monitor.battery_readout_mut().engine_on = false;
        }

        if now.duration_since(start) > MAX_VIRTUAL_RUNTIME {
            warn!("Giving up after {} virtual seconds", MAX_VIRTUAL_RUNTIME.as_secs());
            break;
        }
        now = monitor.next_deadline();
    }

    let d = monitor.diagnostics();
    info!(
        "Done: {} samples, {} renders, {} draw ops, {} parse failures, {} timeouts, {} frames",
        d.sampling_cycles, d.render_passes, d.draw_ops, d.parse_failures, d.read_timeouts, frame
    );
}
