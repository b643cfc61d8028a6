use std::{env, error::Error, fs, path::Path};

use serde::Deserialize;

#[derive(Deserialize)]
struct RawConfig {
    device_id: String,
    wifi_ssid: String,
    wifi_psk: String,
    static_ip: Option<String>,
    gateway: Option<String>,
    dns_server: Option<String>,
    #[serde(default = "default_wifi_poll_interval_ms")]
    wifi_poll_interval_ms: u32,
    #[serde(default)]
    wifi_max_polls: u32,

    #[serde(default = "default_aio_host")]
    aio_host: String,
    aio_port: Option<u16>,
    aio_username: String,
    aio_key: String,
    tls_ca: Option<String>,

    #[serde(default = "enabled")]
    enable_sensors: bool,
    #[serde(default)]
    enable_deep_sleep: bool,
    #[serde(default = "enabled")]
    send_data_to_net: bool,
    #[serde(default)]
    verbose: bool,
    #[serde(default)]
    zero_fill_missing: bool,

    #[serde(default = "default_light_sleep_ms")]
    light_sleep_ms: u32,
    #[serde(default = "default_deep_sleep_ms")]
    deep_sleep_ms: u32,

    #[serde(default = "default_dht_model")]
    dht_model: String,
    #[serde(default = "default_dht_retries")]
    dht_retries: u8,
    #[serde(default = "default_dht_retry_delay_ms")]
    dht_retry_delay_ms: u32,

    air_value: u16,
    water_value: u16,
    #[serde(default = "default_adc_max_raw")]
    adc_max_raw: u16,
    #[serde(default = "default_adc_gain")]
    adc_gain: f32,
    #[serde(default = "default_soil_samples")]
    soil_samples: u8,
    #[serde(default = "default_soil_sample_delay_ms")]
    soil_sample_delay_ms: u32,
    #[serde(default = "enabled")]
    soil_average: bool,
}

fn enabled() -> bool {
    true
}

fn default_wifi_poll_interval_ms() -> u32 {
    1_000
}

fn default_aio_host() -> String {
    "io.adafruit.com".into()
}

const HTTPS_PORT: u16 = 443;
const HTTP_PORT: u16 = 80;

fn default_light_sleep_ms() -> u32 {
    20_000
}

fn default_deep_sleep_ms() -> u32 {
    60_000
}

fn default_dht_model() -> String {
    "dht22".into()
}

fn default_dht_retries() -> u8 {
    3
}

fn default_dht_retry_delay_ms() -> u32 {
    1_000
}

fn default_adc_max_raw() -> u16 {
    1023
}

fn default_adc_gain() -> f32 {
    3.0
}

fn default_soil_samples() -> u8 {
    3
}

fn default_soil_sample_delay_ms() -> u32 {
    2_000
}

fn main() -> Result<(), Box<dyn Error>> {
    // Tell Cargo to rerun if toml changes
    println!("cargo:rerun-if-changed=cfg.toml");
    println!("cargo:rerun-if-changed=cfg.toml.example");

    // Fall back to the example so a fresh checkout still builds
    let path = if Path::new("cfg.toml").exists() {
        "cfg.toml"
    } else {
        println!("cargo:warning=cfg.toml not found, using cfg.toml.example");
        "cfg.toml.example"
    };

    // Read and parse
    let toml_str = fs::read_to_string(path)?;
    let raw: RawConfig = toml::from_str(&toml_str)?;

    let dht_model = match raw.dht_model.to_ascii_lowercase().as_str() {
        "dht11" => "DhtModel::Dht11",
        "dht22" | "am2302" => "DhtModel::Dht22",
        other => return Err(format!("unsupported dht_model {other:?}").into()),
    };

    if raw.air_value == raw.water_value {
        return Err("air_value and water_value must differ".into());
    }

    if raw.adc_max_raw == 0 {
        return Err("adc_max_raw must be greater than zero".into());
    }

    // Plain HTTP to the HTTPS port never gets an answer
    let tls = env::var_os("CARGO_FEATURE_TLS").is_some();
    let aio_port = match (raw.aio_port, tls) {
        (Some(HTTPS_PORT), false) => {
            return Err("aio_port 443 needs the tls feature".into());
        }
        (Some(port), _) => port,
        (None, true) => HTTPS_PORT,
        (None, false) => HTTP_PORT,
    };

    // Generate Rust code
    let out_dir = env::var("OUT_DIR")?;
    let dest_path = Path::new(&out_dir).join("config.rs");
    let code = format!(
        r#"
        pub const CONFIG: Config = Config {{
            device_id: {device_id:?},
            wifi_ssid: {ssid:?},
            wifi_psk: {psk:?},
            static_ip: {static_ip:?},
            gateway: {gateway:?},
            dns_server: {dns:?},
            wifi_poll_interval_ms: {poll},
            wifi_max_polls: {max_polls},
            aio_host: {aio_host:?},
            aio_port: {aio_port},
            aio_username: {aio_username:?},
            aio_key: {aio_key:?},
            tls_ca: {ca:?},
            enable_sensors: {sensors},
            enable_deep_sleep: {deep},
            send_data_to_net: {net},
            verbose: {verbose},
            zero_fill_missing: {zero_fill},
            light_sleep_ms: {light},
            deep_sleep_ms: {deep_ms},
            dht_model: {dht_model},
            dht_retries: {dht_retries},
            dht_retry_delay_ms: {dht_delay},
            air_value: {air},
            water_value: {water},
            adc_max_raw: {adc_max},
            adc_gain: {adc_gain:?},
            soil_samples: {samples},
            soil_sample_delay_ms: {sample_delay},
            soil_average: {average},
        }};
    "#,
        device_id = raw.device_id,
        ssid = raw.wifi_ssid,
        psk = raw.wifi_psk,
        static_ip = raw.static_ip,
        gateway = raw.gateway,
        dns = raw.dns_server,
        poll = raw.wifi_poll_interval_ms,
        max_polls = raw.wifi_max_polls,
        aio_host = raw.aio_host,
        aio_port = aio_port,
        aio_username = raw.aio_username,
        aio_key = raw.aio_key,
        ca = raw.tls_ca,
        sensors = raw.enable_sensors,
        deep = raw.enable_deep_sleep,
        net = raw.send_data_to_net,
        verbose = raw.verbose,
        zero_fill = raw.zero_fill_missing,
        light = raw.light_sleep_ms,
        deep_ms = raw.deep_sleep_ms,
        dht_retries = raw.dht_retries,
        dht_delay = raw.dht_retry_delay_ms,
        air = raw.air_value,
        water = raw.water_value,
        adc_max = raw.adc_max_raw,
        adc_gain = raw.adc_gain,
        samples = raw.soil_samples,
        sample_delay = raw.soil_sample_delay_ms,
        average = raw.soil_average,
    );

    fs::write(dest_path, code)?;
    Ok(())
}
