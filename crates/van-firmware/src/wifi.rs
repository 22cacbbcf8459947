//! Station-mode Wi-Fi driven by proximity transitions
//!
//! The monitor loop only ever talks to [`WifiConnectivity`], which queues
//! commands for [`wifi_task`] and reads back the published status. Joining,
//! DHCP and retries all happen in the task.

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_futures::select::{Either, select};
use embassy_net::Stack;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer, WithTimeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice};
use log::{debug, info, warn};
use van_core::connectivity::{LinkAction, LinkRequest, link_action};
use van_core::proximity::Proximity;
use van_core::{ConnectivityManager, ConnectivityStatus};

use crate::settings::{WIFI_PASSWORD, WIFI_SSID};

const DHCP_TIMEOUT: Duration = Duration::from_secs(15);
const WIFI_RETRY: Duration = Duration::from_secs(30);
const LINK_POLL: Duration = Duration::from_millis(500);

static WIFI_COMMANDS: Channel<CriticalSectionRawMutex, LinkRequest, 4> = Channel::new();
static WIFI_STATUS: AtomicU8 = AtomicU8::new(STATUS_DISCONNECTED);

const STATUS_DISCONNECTED: u8 = 0;
const STATUS_CONNECTING: u8 = 1;
const STATUS_CONNECTED: u8 = 2;

fn publish(status: ConnectivityStatus) {
    let raw = match status {
        ConnectivityStatus::Disconnected => STATUS_DISCONNECTED,
        ConnectivityStatus::Connecting => STATUS_CONNECTING,
        ConnectivityStatus::Connected => STATUS_CONNECTED,
    };
    WIFI_STATUS.store(raw, Ordering::Relaxed);
}

pub fn current_status() -> ConnectivityStatus {
    match WIFI_STATUS.load(Ordering::Relaxed) {
        STATUS_CONNECTING => ConnectivityStatus::Connecting,
        STATUS_CONNECTED => ConnectivityStatus::Connected,
        _ => ConnectivityStatus::Disconnected,
    }
}

/// Handle given to the monitor loop. A disabled handle, for builds without
/// credentials, ignores transitions and always reports `Disconnected`.
#[derive(Debug)]
pub struct WifiConnectivity {
    enabled: bool,
}

impl WifiConnectivity {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl ConnectivityManager for WifiConnectivity {
    fn on_proximity_changed(&mut self, proximity: Proximity) {
        if !self.enabled {
            debug!("Wi-Fi not configured, ignoring {:?}", proximity);
            return;
        }
        let Some(request) = LinkRequest::for_transition(proximity) else {
            return;
        };
        if WIFI_COMMANDS.try_send(request).is_err() {
            warn!("Wi-Fi command queue full, dropping {:?}", request);
        }
    }

    fn status(&self) -> ConnectivityStatus {
        current_status()
    }
}

/// Join the configured network and wait for an address
async fn connect(controller: &mut WifiController<'static>, stack: Stack<'static>) -> bool {
    publish(ConnectivityStatus::Connecting);

    if !matches!(controller.is_started(), Ok(true)) {
        let config = ModeConfig::Client(
            ClientConfig::default()
                .with_ssid(WIFI_SSID.into())
                .with_password(WIFI_PASSWORD.into()),
        );
        if let Err(e) = controller.set_config(&config) {
            warn!("Wi-Fi config rejected: {:?}", e);
            return false;
        }
        if let Err(e) = controller.start_async().await {
            warn!("Wi-Fi start failed: {:?}", e);
            return false;
        }
    }

    info!("Joining {:?}", WIFI_SSID);
    if let Err(e) = controller.connect_async().await {
        warn!("Wi-Fi join failed: {:?}", e);
        return false;
    }
    if stack.wait_config_up().with_timeout(DHCP_TIMEOUT).await.is_err() {
        warn!("No DHCP lease within {}s", DHCP_TIMEOUT.as_secs());
        return false;
    }
    if let Some(config) = stack.config_v4() {
        info!("Wi-Fi connected, address {}", config.address);
    }
    true
}

async fn disconnect(controller: &mut WifiController<'static>) {
    if matches!(controller.is_connected(), Ok(true)) {
        if let Err(e) = controller.disconnect_async().await {
            warn!("Wi-Fi disconnect failed: {:?}", e);
        }
    }
    publish(ConnectivityStatus::Disconnected);
}

/// Resolves when the link drops
async fn watch_link(stack: Stack<'static>) {
    while stack.is_link_up() {
        Timer::after(LINK_POLL).await;
    }
}

/// Owns the controller. Stays connected while the van is near home and
/// retries every [`WIFI_RETRY`] until it succeeds or is told to stop.
#[embassy_executor::task]
pub async fn wifi_task(mut controller: WifiController<'static>, stack: Stack<'static>) {
    let mut wanted = false;

    loop {
        if !wanted {
            let request = WIFI_COMMANDS.receive().await;
            wanted = link_action(request, current_status()) == LinkAction::Join;
            continue;
        }

        if !connect(&mut controller, stack).await {
            // Back off, but a Disconnect cancels the retry
            disconnect(&mut controller).await;
            publish(ConnectivityStatus::Connecting);
            if let Either::First(request) =
                select(WIFI_COMMANDS.receive(), Timer::after(WIFI_RETRY)).await
            {
                if link_action(request, current_status()) == LinkAction::Leave {
                    wanted = false;
                    publish(ConnectivityStatus::Disconnected);
                }
            }
            continue;
        }

        publish(ConnectivityStatus::Connected);
        loop {
            match select(WIFI_COMMANDS.receive(), watch_link(stack)).await {
                Either::First(request) => match link_action(request, current_status()) {
                    LinkAction::Leave => {
                        info!("Left home, releasing Wi-Fi");
                        wanted = false;
                        disconnect(&mut controller).await;
                        break;
                    }
                    LinkAction::Join | LinkAction::Nothing => {
                        debug!("Already connected, ignoring {:?}", request);
                    }
                },
                Either::Second(()) => {
                    warn!("Wi-Fi link lost");
                    publish(ConnectivityStatus::Connecting);
                    break;
                }
            }
        }
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: embassy_net::Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
