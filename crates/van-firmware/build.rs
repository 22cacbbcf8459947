//! Bakes the home location and Wi-Fi credentials from `.env` into the binary

const SETTINGS: [(&str, &str); 4] = [
    ("VAN_HOME_LAT", "40.7128"),
    ("VAN_HOME_LON", "-74.0060"),
    ("VAN_WIFI_SSID", ""),
    ("VAN_WIFI_PASSWORD", ""),
];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    if let Err(e) = dotenvy::dotenv() {
        println!("cargo:warning=No .env file loaded ({e}), using placeholders");
    }

    for (name, fallback) in SETTINGS {
        println!("cargo:rerun-if-env-changed={name}");
        let value = match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                println!("cargo:warning={name} not set, defaulting to {fallback:?}");
                fallback.to_string()
            }
        };
        println!("cargo:rustc-env={name}={value}");
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
