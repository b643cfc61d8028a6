#![allow(async_fn_in_trait)]

pub mod climate;
pub mod dht;
pub mod soil;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorError {
    /// Sensor did not answer in time
    Timeout,
    /// Frame checksum mismatch
    Checksum,
    /// Pin or ADC access failed
    Bus,
    /// Decoded value outside the sensor's physical range
    OutOfRange,
    /// Anything the read strategies do not know how to recover from
    Fault(&'static str),
}

impl SensorError {
    /// Whether a local retry may succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, SensorError::Fault(_))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClimateSample {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
}

impl ClimateSample {
    pub const MISSING: Self = Self {
        temperature: None,
        humidity: None,
    };

    pub const fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature: Some(temperature),
            humidity: Some(humidity),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.temperature.is_some() && self.humidity.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SoilReading {
    pub sensor_voltage: Option<f32>,
    pub moisture_percent: Option<f32>,
}

impl SoilReading {
    pub const MISSING: Self = Self {
        sensor_voltage: None,
        moisture_percent: None,
    };
}

/// Digital temperature/humidity sensor
pub trait ClimateSensor {
    /// Perform one synchronous measurement
    async fn measure(&mut self) -> Result<ClimateSample, SensorError>;
}

/// Analog soil moisture probe
pub trait MoistureProbe {
    /// Take one raw ADC sample, `None` when the conversion yields nothing
    fn sample(&mut self) -> Result<Option<u16>, SensorError>;
}
