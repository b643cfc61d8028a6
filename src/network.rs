#![allow(async_fn_in_trait)]

use core::net::Ipv4Addr;

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use crate::constants::LED_BLINK_COUNT;
use crate::indicator::StatusLed;

/// Station association state as reported by the radio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    Idle,
    Connecting,
    Connected,
    WrongPassword,
    NoAccessPoint,
    ConnectFailed,
}

impl LinkStatus {
    /// Further polling cannot change the outcome
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LinkStatus::WrongPassword | LinkStatus::NoAccessPoint | LinkStatus::ConnectFailed
        )
    }
}

/// Wi-Fi station interface.
pub trait Station {
    fn is_connected(&self) -> bool;

    /// Make one association attempt (or poll one in progress) and report
    /// where it stands.
    async fn connect(&mut self) -> LinkStatus;

    async fn disconnect(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssociationSettings {
    pub poll_interval_ms: u32,
    /// 0 polls forever
    pub max_polls: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationError {
    Terminal(LinkStatus),
    TimedOut,
}

/// Bring the station up, blinking `led` while it is connecting.
pub async fn associate<S, P, D>(
    station: &mut S,
    led: &mut StatusLed<P>,
    delay: &mut D,
    settings: AssociationSettings,
) -> Result<(), AssociationError>
where
    S: Station,
    P: OutputPin,
    D: DelayNs,
{
    if station.is_connected() {
        debug!("Already connected");
        return Ok(());
    }

    info!("Connecting to network...");
    let mut polls: u32 = 0;
    loop {
        let status = station.connect().await;
        match status {
            LinkStatus::Connected => {
                info!("Network connected");
                led.off();
                return Ok(());
            }
            status if status.is_terminal() => {
                warn!("Association failed: {:?}", status);
                led.off();
                return Err(AssociationError::Terminal(status));
            }
            status => debug!("Association status: {:?}", status),
        }

        polls += 1;
        if settings.max_polls != 0 && polls >= settings.max_polls {
            warn!("Association timed out after {} polls", polls);
            led.off();
            return Err(AssociationError::TimedOut);
        }

        led.blink(delay, LED_BLINK_COUNT).await;
        delay.delay_ms(settings.poll_interval_ms).await;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressError {
    InvalidAddress,
    InvalidPrefix,
    InvalidGateway,
    InvalidDns,
}

/// Fixed IPv4 configuration used instead of DHCP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticAddressing {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
    pub gateway: Option<Ipv4Addr>,
    pub dns_server: Option<Ipv4Addr>,
}

impl StaticAddressing {
    /// `None` when no static address is configured.
    pub fn from_config(
        cidr: Option<&str>,
        gateway: Option<&str>,
        dns_server: Option<&str>,
    ) -> Result<Option<Self>, AddressError> {
        let Some(cidr) = cidr else {
            return Ok(None);
        };

        let (address, prefix_len) = parse_cidr(cidr)?;
        let gateway = gateway
            .map(|gw| gw.parse().map_err(|_| AddressError::InvalidGateway))
            .transpose()?;
        let dns_server = dns_server
            .map(|dns| dns.parse().map_err(|_| AddressError::InvalidDns))
            .transpose()?;

        Ok(Some(Self {
            address,
            prefix_len,
            gateway,
            dns_server,
        }))
    }
}

/// Parse `a.b.c.d/len`. A bare address is taken as a /24.
pub fn parse_cidr(cidr: &str) -> Result<(Ipv4Addr, u8), AddressError> {
    let (address, prefix_len) = match cidr.split_once('/') {
        Some((address, len)) => (
            address,
            len.trim()
                .parse::<u8>()
                .map_err(|_| AddressError::InvalidPrefix)?,
        ),
        None => (cidr, 24),
    };

    if prefix_len > 32 {
        return Err(AddressError::InvalidPrefix);
    }

    let address = address
        .trim()
        .parse()
        .map_err(|_| AddressError::InvalidAddress)?;
    Ok((address, prefix_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingDelay, RecordingPin};
    use embassy_futures::block_on;
    use std::collections::VecDeque;

    struct ScriptedStation {
        connected: bool,
        statuses: VecDeque<LinkStatus>,
        attempts: usize,
    }

    impl ScriptedStation {
        fn new(statuses: Vec<LinkStatus>) -> Self {
            Self {
                connected: false,
                statuses: statuses.into(),
                attempts: 0,
            }
        }
    }

    impl Station for ScriptedStation {
        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn connect(&mut self) -> LinkStatus {
            self.attempts += 1;
            let status = self.statuses.pop_front().unwrap_or(LinkStatus::Connecting);
            self.connected = status == LinkStatus::Connected;
            status
        }

        async fn disconnect(&mut self) {
            self.connected = false;
        }
    }

    const SETTINGS: AssociationSettings = AssociationSettings {
        poll_interval_ms: 500,
        max_polls: 0,
    };

    #[test]
    fn connected_station_is_left_alone() {
        let mut station = ScriptedStation::new(vec![]);
        station.connected = true;
        let mut led = StatusLed::new(RecordingPin::default());
        let mut delay = RecordingDelay::default();

        let result = block_on(associate(&mut station, &mut led, &mut delay, SETTINGS));

        assert_eq!(result, Ok(()));
        assert_eq!(station.attempts, 0);
        assert!(delay.delays_ms.is_empty());
    }

    #[test]
    fn polls_until_connected_and_blinks_meanwhile() {
        let mut station = ScriptedStation::new(vec![
            LinkStatus::Idle,
            LinkStatus::Connecting,
            LinkStatus::Connected,
        ]);
        let mut led = StatusLed::new(RecordingPin::default());
        let mut delay = RecordingDelay::default();

        let result = block_on(associate(&mut station, &mut led, &mut delay, SETTINGS));

        assert_eq!(result, Ok(()));
        assert_eq!(station.attempts, 3);
        assert_eq!(delay.delays_ms.iter().filter(|&&ms| ms == 500).count(), 2);
        let offs = led.pin().levels.iter().filter(|&&lit| !lit).count();
        assert_eq!(offs, 2 * LED_BLINK_COUNT as usize + 1);
    }

    #[test]
    fn wrong_password_stops_polling() {
        let mut station = ScriptedStation::new(vec![LinkStatus::Connecting, LinkStatus::WrongPassword]);
        let mut led = StatusLed::new(RecordingPin::default());
        let mut delay = RecordingDelay::default();

        let result = block_on(associate(&mut station, &mut led, &mut delay, SETTINGS));

        assert_eq!(result, Err(AssociationError::Terminal(LinkStatus::WrongPassword)));
        assert_eq!(station.attempts, 2);
    }

    #[test]
    fn bounded_polling_times_out() {
        let mut station = ScriptedStation::new(vec![]);
        let mut led = StatusLed::new(RecordingPin::default());
        let mut delay = RecordingDelay::default();
        let settings = AssociationSettings {
            poll_interval_ms: 500,
            max_polls: 4,
        };

        let result = block_on(associate(&mut station, &mut led, &mut delay, settings));

        assert_eq!(result, Err(AssociationError::TimedOut));
        assert_eq!(station.attempts, 4);
    }

    #[test]
    fn terminal_statuses() {
        assert!(LinkStatus::NoAccessPoint.is_terminal());
        assert!(LinkStatus::ConnectFailed.is_terminal());
        assert!(!LinkStatus::Connecting.is_terminal());
        assert!(!LinkStatus::Idle.is_terminal());
    }

    #[test]
    fn parses_cidr_notation() {
        assert_eq!(
            parse_cidr("192.168.1.41/24"),
            Ok((Ipv4Addr::new(192, 168, 1, 41), 24))
        );
        assert_eq!(parse_cidr("10.0.0.7"), Ok((Ipv4Addr::new(10, 0, 0, 7), 24)));
        assert_eq!(parse_cidr("10.0.0.7/33"), Err(AddressError::InvalidPrefix));
        assert_eq!(parse_cidr("10.0.0/8"), Err(AddressError::InvalidAddress));
        assert_eq!(parse_cidr("10.0.0.7/x"), Err(AddressError::InvalidPrefix));
    }

    #[test]
    fn static_addressing_from_config() {
        assert_eq!(StaticAddressing::from_config(None, Some("10.0.0.1"), None), Ok(None));

        let addressing =
            StaticAddressing::from_config(Some("192.168.1.41/24"), Some("192.168.1.1"), Some("1.1.1.1"))
                .unwrap()
                .unwrap();
        assert_eq!(addressing.gateway, Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(addressing.dns_server, Some(Ipv4Addr::new(1, 1, 1, 1)));

        assert_eq!(
            StaticAddressing::from_config(Some("192.168.1.41/24"), Some("gateway"), None),
            Err(AddressError::InvalidGateway)
        );
    }
}
