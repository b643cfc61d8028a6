use crate::sensors::dht::DhtModel;

pub struct Config {
    // Device ID (used as DHCP hostname)
    pub device_id: &'static str,

    // Wi-Fi SSID to connect to
    pub wifi_ssid: &'static str,

    // Wi-Fi pre-shared key (password)
    pub wifi_psk: &'static str,

    // Static IPv4 address in CIDR notation (DHCP when absent)
    pub static_ip: Option<&'static str>,

    // Static gateway address
    pub gateway: Option<&'static str>,

    // Static DNS server address
    pub dns_server: Option<&'static str>,

    // Interval between association status polls in milliseconds
    pub wifi_poll_interval_ms: u32,

    // Maximum number of association polls (0 = unbounded)
    pub wifi_max_polls: u32,

    // Adafruit IO hostname
    pub aio_host: &'static str,

    // Adafruit IO port (443 with TLS, 80 without)
    pub aio_port: u16,

    // Adafruit IO account name
    pub aio_username: &'static str,

    // Adafruit IO API key
    pub aio_key: &'static str,

    // TLS CA certificate (optional)
    pub tls_ca: Option<&'static str>,

    // Read the sensors each cycle
    pub enable_sensors: bool,

    // Enter deep sleep after the light sleep
    pub enable_deep_sleep: bool,

    // Upload readings to Adafruit IO
    pub send_data_to_net: bool,

    // Log at debug level instead of warnings only
    pub verbose: bool,

    // Send "0" for missing readings instead of skipping the feed
    pub zero_fill_missing: bool,

    // Light sleep duration in milliseconds
    pub light_sleep_ms: u32,

    // Deep sleep duration in milliseconds
    pub deep_sleep_ms: u32,

    // Temperature/humidity sensor model
    pub dht_model: DhtModel,

    // Maximum DHT read attempts per cycle
    pub dht_retries: u8,

    // Delay between DHT read attempts in milliseconds
    pub dht_retry_delay_ms: u32,

    // Raw ADC value with the probe in air (0 %)
    pub air_value: u16,

    // Raw ADC value with the probe in water (100 %)
    pub water_value: u16,

    // Full-scale raw ADC value
    pub adc_max_raw: u16,

    // Voltage divider gain applied to the normalized ADC value
    pub adc_gain: f32,

    // ADC samples taken per cycle
    pub soil_samples: u8,

    // Delay between ADC samples in milliseconds
    pub soil_sample_delay_ms: u32,

    // Average all samples (false keeps the first valid sample)
    pub soil_average: bool,
}

// config values are generated at compile time
include!(concat!(env!("OUT_DIR"), "/config.rs"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_port_matches_transport() {
        if cfg!(feature = "tls") {
            assert_ne!(CONFIG.aio_port, 80);
        } else {
            assert_ne!(CONFIG.aio_port, 443);
        }
    }
}
