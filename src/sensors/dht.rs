//! DHT11 / DHT22 (AM2302) single-wire temperature and humidity sensor.
//!
//! The host pulls the data line low to request a measurement, the sensor
//! answers with an 80 µs low/high preamble followed by 40 bits. Every bit
//! starts with a ~50 µs low phase; the length of the following high phase
//! encodes the value (~27 µs for 0, ~70 µs for 1). Sampling the line 35 µs
//! after the rising edge tells them apart.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::{ClimateSample, ClimateSensor, SensorError};

/// Polls of the data line (1 µs apart) before a phase counts as timed out
const LEVEL_TIMEOUT_US: u32 = 100;
/// Sample point after the rising edge of a data bit
const BIT_SAMPLE_US: u32 = 35;
/// Release time between the start pulse and the sensor response
const RELEASE_US: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhtModel {
    Dht11,
    Dht22,
}

impl DhtModel {
    fn start_pulse_us(self) -> u32 {
        match self {
            DhtModel::Dht11 => 18_000,
            DhtModel::Dht22 => 1_100,
        }
    }
}

pub struct Dht<P, D> {
    pin: P,
    delay: D,
    model: DhtModel,
}

impl<P, D> Dht<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// `pin` must be configured as open-drain with a pull-up.
    pub fn new(mut pin: P, delay: D, model: DhtModel) -> Self {
        pin.set_high().ok();
        Self { pin, delay, model }
    }

    /// Hold the line low long enough for the sensor to wake up. Only the
    /// minimum length matters, so interrupts may stay enabled.
    pub fn start(&mut self) -> Result<(), SensorError> {
        self.pin.set_low().map_err(|_| SensorError::Bus)?;
        self.delay.delay_us(self.model.start_pulse_us());
        Ok(())
    }

    /// Release the line and capture one raw 5-byte frame. Timing sensitive:
    /// run with interrupts disabled.
    pub fn capture_frame(&mut self) -> Result<[u8; 5], SensorError> {
        self.pin.set_high().map_err(|_| SensorError::Bus)?;
        self.delay.delay_us(RELEASE_US);

        self.wait_for_level(false)?;
        self.wait_for_level(true)?;
        self.wait_for_level(false)?;

        let mut frame = [0u8; 5];
        for byte in frame.iter_mut() {
            for _ in 0..8 {
                self.wait_for_level(true)?;
                self.delay.delay_us(BIT_SAMPLE_US);
                let bit = self.pin.is_high().map_err(|_| SensorError::Bus)?;
                *byte = (*byte << 1) | bit as u8;
                if bit {
                    self.wait_for_level(false)?;
                }
            }
        }

        Ok(frame)
    }

    fn wait_for_level(&mut self, high: bool) -> Result<(), SensorError> {
        for _ in 0..LEVEL_TIMEOUT_US {
            if self.pin.is_high().map_err(|_| SensorError::Bus)? == high {
                return Ok(());
            }
            self.delay.delay_us(1);
        }
        Err(SensorError::Timeout)
    }
}

impl<P, D> ClimateSensor for Dht<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    async fn measure(&mut self) -> Result<ClimateSample, SensorError> {
        self.start()?;
        let frame = critical_section::with(|_| self.capture_frame())?;
        decode_frame(self.model, frame)
    }
}

/// Validate the checksum and convert a raw frame to °C / %RH.
pub fn decode_frame(model: DhtModel, frame: [u8; 5]) -> Result<ClimateSample, SensorError> {
    let checksum = frame[..4]
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    if checksum != frame[4] {
        return Err(SensorError::Checksum);
    }

    let (temperature, humidity) = match model {
        DhtModel::Dht22 => {
            let humidity = u16::from_be_bytes([frame[0], frame[1]]) as f32 / 10.0;
            let raw_temp = u16::from_be_bytes([frame[2], frame[3]]);
            let mut temperature = (raw_temp & 0x7FFF) as f32 / 10.0;
            if raw_temp & 0x8000 != 0 {
                temperature = -temperature;
            }
            (temperature, humidity)
        }
        DhtModel::Dht11 => {
            let humidity = frame[0] as f32 + frame[1] as f32 / 10.0;
            let mut temperature = frame[2] as f32 + (frame[3] & 0x0F) as f32 / 10.0;
            if frame[3] & 0x80 != 0 {
                temperature = -temperature;
            }
            (temperature, humidity)
        }
    };

    if !(0.0..=100.0).contains(&humidity) || !(-40.0..=80.0).contains(&temperature) {
        return Err(SensorError::OutOfRange);
    }

    Ok(ClimateSample::new(temperature, humidity))
}
