use core::str::FromStr;

use embassy_executor::Spawner;
use embassy_net::{
    Config as NetConfig, DhcpConfig, Ipv4Cidr, Runner, Stack, StackResources, StaticConfigV4,
};
use embassy_time::{Duration, with_timeout};
use esp_hal::rng::Rng;
use esp_radio::{
    Controller,
    wifi::{ClientConfig, Config, ModeConfig, ScanConfig, WifiController, WifiDevice},
};
use heapless::String;
use log::{debug, info, warn};
use static_cell::StaticCell;

use crate::config::CONFIG;
use crate::constants::{WIFI_CONNECT_TIMEOUT_SECS, WIFI_IP_TIMEOUT_SECS, WIFI_SCAN_MAX};
use crate::network::{AddressError, LinkStatus, StaticAddressing, Station};

static RESOURCES: StaticCell<StackResources<5>> = StaticCell::new();

#[derive(Debug)]
pub enum Error {
    WifiInitFailed,
    HostnameTooLong,
    #[allow(dead_code)]
    InvalidAddress(AddressError),
    TaskSpawnFailed,
}

/// Wi-Fi station driven one association attempt at a time.
pub struct Wifi {
    pub stack: Stack<'static>,
    controller: WifiController<'static>,
    started: bool,
}

impl Wifi {
    pub async fn new(
        init: &'static Controller<'static>,
        wifi: esp_hal::peripherals::WIFI<'static>,
        rng: Rng,
        spawner: Spawner,
    ) -> Result<Self, Error> {
        let (controller, interfaces) = esp_radio::wifi::new(init, wifi, Config::default())
            .map_err(|_| Error::WifiInitFailed)?;

        let config = net_config()?;
        let seed = (rng.random() as u64) << 32 | rng.random() as u64;

        let resources = RESOURCES.init(StackResources::new());
        let (stack, runner) = embassy_net::new(interfaces.sta, config, resources, seed);

        spawner
            .spawn(net_task(runner))
            .map_err(|_| Error::TaskSpawnFailed)?;

        Ok(Self {
            stack,
            controller,
            started: false,
        })
    }

    /// Configure the station and check the access point is in range.
    async fn start(&mut self) -> LinkStatus {
        let client_config = ClientConfig::default()
            .with_ssid(CONFIG.wifi_ssid.into())
            .with_password(CONFIG.wifi_psk.into());
        if let Err(e) = self.controller.set_config(&ModeConfig::Client(client_config)) {
            warn!("Failed to set WiFi config: {:?}", e);
            return LinkStatus::ConnectFailed;
        }

        info!("Starting wifi");
        if let Err(e) = self.controller.start_async().await {
            warn!("Failed to start WiFi: {:?}", e);
            return LinkStatus::ConnectFailed;
        }
        self.started = true;

        let scan_config = ScanConfig::default().with_max(WIFI_SCAN_MAX);
        match self.controller.scan_with_config_async(scan_config).await {
            Ok(access_points) => {
                for ap in &access_points {
                    debug!("{:?}", ap);
                }
                if !access_points.iter().any(|ap| ap.ssid == CONFIG.wifi_ssid) {
                    warn!("Access point {:?} not found", CONFIG.wifi_ssid);
                    return LinkStatus::NoAccessPoint;
                }
            }
            // Not fatal, the connect attempt will tell
            Err(e) => warn!("Scan failed: {:?}", e),
        }

        LinkStatus::Idle
    }
}

impl Station for Wifi {
    fn is_connected(&self) -> bool {
        matches!(self.controller.is_connected(), Ok(true)) && self.stack.config_v4().is_some()
    }

    async fn connect(&mut self) -> LinkStatus {
        if !self.started {
            let status = self.start().await;
            if status.is_terminal() {
                return status;
            }
        }

        if !matches!(self.controller.is_connected(), Ok(true)) {
            info!("About to connect to {:?}...", CONFIG.wifi_ssid);
            match with_timeout(
                Duration::from_secs(WIFI_CONNECT_TIMEOUT_SECS),
                self.controller.connect_async(),
            )
            .await
            {
                Ok(Ok(())) => info!("Wifi connected!"),
                Ok(Err(e)) => {
                    warn!("Failed to connect to wifi: {:?}", e);
                    return LinkStatus::Connecting;
                }
                Err(_) => {
                    warn!("Wifi connection timed out");
                    return LinkStatus::Connecting;
                }
            }
        }

        debug!("Waiting to get IP address...");
        match with_timeout(
            Duration::from_secs(WIFI_IP_TIMEOUT_SECS),
            self.stack.wait_config_up(),
        )
        .await
        {
            Ok(()) => {
                if let Some(config) = self.stack.config_v4() {
                    info!("Got IP: {}", config.address);
                }
                LinkStatus::Connected
            }
            Err(_) => {
                warn!("Timed out waiting for an IP address");
                LinkStatus::Connecting
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Err(e) = self.controller.disconnect_async().await {
            debug!("Disconnect failed: {:?}", e);
        }
    }
}

/// Static addressing when configured, DHCP with the device id as hostname
/// otherwise.
fn net_config() -> Result<NetConfig, Error> {
    let addressing = StaticAddressing::from_config(CONFIG.static_ip, CONFIG.gateway, CONFIG.dns_server)
        .map_err(Error::InvalidAddress)?;

    if let Some(addressing) = addressing {
        info!("Using static address {}/{}", addressing.address, addressing.prefix_len);
        let mut dns_servers = heapless::Vec::new();
        if let Some(dns) = addressing.dns_server {
            dns_servers.push(dns).ok();
        }
        return Ok(NetConfig::ipv4_static(StaticConfigV4 {
            address: Ipv4Cidr::new(addressing.address, addressing.prefix_len),
            gateway: addressing.gateway,
            dns_servers,
        }));
    }

    let mut dhcp_config = DhcpConfig::default();
    dhcp_config.hostname =
        Some(String::<32>::from_str(CONFIG.device_id).map_err(|_| Error::HostnameTooLong)?);
    Ok(NetConfig::dhcpv4(dhcp_config))
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
