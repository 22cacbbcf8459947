//! Settings baked in at build time by `build.rs`

use log::warn;
use van_core::MonitorConfig;
use van_core::geo::Coordinate;

pub const WIFI_SSID: &str = env!("VAN_WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("VAN_WIFI_PASSWORD");

const HOME_LAT: &str = env!("VAN_HOME_LAT");
const HOME_LON: &str = env!("VAN_HOME_LON");

/// Device configuration: defaults plus the baked home coordinate
pub fn monitor_config() -> MonitorConfig {
    let config = MonitorConfig::default();
    match (HOME_LAT.trim().parse::<f64>(), HOME_LON.trim().parse::<f64>()) {
        (Ok(latitude), Ok(longitude)) => config.with_home(Coordinate::new(latitude, longitude)),
        _ => {
            warn!(
                "Unparseable home coordinate ({:?}, {:?}), keeping the default",
                HOME_LAT, HOME_LON
            );
            config
        }
    }
}

pub fn wifi_configured() -> bool {
    !WIFI_SSID.is_empty()
}
