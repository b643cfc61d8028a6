use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcPin};
use esp_hal::peripherals::{ADC1, GPIO34};

use crate::sensors::{MoistureProbe, SensorError};

pub type SoilAdc = Adc<'static, ADC1<'static>, Blocking>;
pub type SoilAdcPin = AdcPin<GPIO34<'static>, ADC1<'static>>;

/// Capacitive soil probe on an ADC1 channel
pub struct AdcProbe {
    adc: SoilAdc,
    pin: SoilAdcPin,
}

impl AdcProbe {
    pub fn new(adc: SoilAdc, pin: SoilAdcPin) -> Self {
        Self { adc, pin }
    }
}

impl MoistureProbe for AdcProbe {
    fn sample(&mut self) -> Result<Option<u16>, SensorError> {
        nb::block!(self.adc.read_oneshot(&mut self.pin))
            .map(Some)
            .map_err(|_| SensorError::Bus)
    }
}
