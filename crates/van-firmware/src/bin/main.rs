#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_time::{Duration, Instant, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::rng::Rng;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::rtc_cntl::sleep::TimerWakeupSource;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};
use static_cell::StaticCell;
use van_core::display::colors;
use van_core::proximity::Proximity;
use van_core::{ConnectivityManager, ConnectivityStatus, GraphicsSink, MonitorConfig, MonitorLoop, RunExit};
use van_firmware::board::{self, I2cDevice};
use van_firmware::gps::UartGps;
use van_firmware::power::{self, AxpBattery, SHUTDOWN};
use van_firmware::settings;
use van_firmware::shared_i2c::BusDevice;
use van_firmware::wifi::{self, WifiConnectivity};

// Display-LCD panel specific imports
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use mipidsi::interface::SpiInterface;
use mipidsi::{Builder as MipidsiBuilder, models::ILI9342CRgb565};

const DISPLAY_WIDTH: u16 = 320;
const DISPLAY_HEIGHT: u16 = 240;

/// Time for a pending Wi-Fi disconnect and the last frame before sleeping
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Deep sleep length before the board boots and checks the engine again
const SLEEP_INTERVAL: core::time::Duration = core::time::Duration::from_secs(10);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    // Power rails first, the panel is dark until ALDO4 is up
    let i2c_bus = match board::create_i2c_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11) {
        Ok(bus) => bus,
        Err(e) => halt_with(e).await,
    };
    board::init_power_rails(i2c_bus).await;

    let spi_bus = match Spi::new(peripherals.SPI2, SpiConfig::default()) {
        Ok(spi) => spi.with_sck(peripherals.GPIO36).with_mosi(peripherals.GPIO37),
        Err(e) => halt_with(e).await,
    };
    let cs = Output::new(peripherals.GPIO35, Level::High, OutputConfig::default());
    let spi_device = match ExclusiveDevice::new_no_delay(spi_bus, cs) {
        Ok(device) => device,
        Err(e) => halt_with(e).await,
    };
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());
    let mut spi_buffer = [0u8; 64];
    let di = SpiInterface::new(spi_device, dc, &mut spi_buffer);
    let display = match MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .init(&mut embassy_time::Delay)
    {
        Ok(display) => display,
        Err(e) => halt_with(e).await,
    };
    let mut sink = GraphicsSink::new(display);
    if let Err(e) = sink.show_message("VAN MONITOR", colors::WHITE) {
        warn!("Splash screen failed: {:?}", e);
    }
    info!("Display initialized");

    let mut battery = AxpBattery::new(BusDevice::new(i2c_bus));
    if let Err(e) = battery.enable_adc().await {
        warn!("Battery ADC enable failed, voltage will read low: {:?}", e);
    }

    let gps_uart = match board::create_gps_uart(peripherals.UART1, peripherals.GPIO17, peripherals.GPIO18) {
        Ok(uart) => uart,
        Err(e) => halt_with(e).await,
    };
    let gps = UartGps::new(gps_uart);

    let power_key: I2cDevice = BusDevice::new(i2c_bus);
    if let Err(e) = spawner.spawn(power::power_key_task(power_key)) {
        warn!("Power key task not started: {:?}", e);
    }

    let wifi_enabled = settings::wifi_configured() && start_wifi(&spawner, peripherals.WIFI);
    let connectivity = WifiConnectivity::new(wifi_enabled);

    let mut config = settings::monitor_config();
    if let Err(e) = config.validate() {
        error!("Invalid configuration ({}), falling back to defaults", e);
        config = MonitorConfig::default();
    }
    info!(
        "Home {:?}, radius {}, sampling every {} ms",
        config.home,
        config.home_radius,
        config.sample_interval.as_millis()
    );

    let mut monitor = match MonitorLoop::new(config, gps, battery, connectivity, Instant::now()) {
        Ok(monitor) => monitor,
        Err(e) => halt_with(e).await,
    };

    let exit = monitor.run(&mut sink, &SHUTDOWN).await;
    let d = monitor.diagnostics();
    info!(
        "Exited with {:?} after {} samples, {} renders, {} draw ops",
        exit, d.sampling_cycles, d.render_passes, d.draw_ops
    );

    let message = match exit {
        RunExit::ShutdownDue => "ENGINE OFF",
        RunExit::Signalled => "SHUTTING DOWN",
    };
    if let Err(e) = sink.show_message(message, colors::YELLOW) {
        warn!("Shutdown screen failed: {:?}", e);
    }

    // Release the network before the radio loses power
    if monitor.connectivity().status() != ConnectivityStatus::Disconnected {
        monitor.connectivity_mut().on_proximity_changed(Proximity::Far);
    }
    Timer::after(SHUTDOWN_GRACE).await;

    info!("Entering deep sleep for {} s", SLEEP_INTERVAL.as_secs());
    let mut rtc = Rtc::new(peripherals.LPWR);
    let wakeup = TimerWakeupSource::new(SLEEP_INTERVAL);
    rtc.sleep_deep(&[&wakeup])
}

/// Nothing useful can happen without the board; park and keep logging
async fn halt_with<E: core::fmt::Debug>(e: E) -> ! {
    loop {
        error!("Board bring-up failed: {:?}", e);
        Timer::after(Duration::from_secs(5)).await;
    }
}

/// Bring up the radio and spawn the Wi-Fi and network tasks.
/// Returns false when the radio is unusable; the monitor runs without it.
fn start_wifi(spawner: &Spawner, wifi_peripheral: esp_hal::peripherals::WIFI<'static>) -> bool {
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static NET_RESOURCES: StaticCell<embassy_net::StackResources<4>> = StaticCell::new();

    let radio = match esp_radio::init() {
        Ok(radio) => RADIO.init(radio),
        Err(e) => {
            error!("Radio init failed: {:?}", e);
            return false;
        }
    };
    let (controller, interfaces) = match esp_radio::wifi::new(radio, wifi_peripheral, Default::default()) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Wi-Fi init failed: {:?}", e);
            return false;
        }
    };

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(embassy_net::StackResources::<4>::new()),
        seed,
    );

    if let Err(e) = spawner.spawn(wifi::net_task(runner)) {
        error!("Network task not started: {:?}", e);
        return false;
    }
    if let Err(e) = spawner.spawn(wifi::wifi_task(controller, stack)) {
        error!("Wi-Fi task not started: {:?}", e);
        return false;
    }
    info!("Wi-Fi ready, waiting for home proximity");
    true
}
