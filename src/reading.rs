use core::fmt::Write;

use heapless::{String, Vec};

use crate::sensors::{ClimateSample, SoilReading};

/// Feeds published per cycle
pub const FEED_COUNT: usize = 4;

/// Room for a formatted value such as `-12.3` or `100.0`
pub type FeedString = String<16>;

/// One value destined for one feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedValue {
    pub feed: &'static str,
    pub value: FeedString,
}

pub type Payload = Vec<FeedValue, FEED_COUNT>;

/// All values gathered during one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub sensor_voltage: Option<f32>,
    pub soil_moisture_percent: Option<f32>,
}

impl Reading {
    pub const EMPTY: Self = Self {
        temperature: None,
        humidity: None,
        sensor_voltage: None,
        soil_moisture_percent: None,
    };

    pub fn new(climate: ClimateSample, soil: SoilReading) -> Self {
        Self {
            temperature: climate.temperature,
            humidity: climate.humidity,
            sensor_voltage: soil.sensor_voltage,
            soil_moisture_percent: soil.moisture_percent,
        }
    }

    /// Feed values in upload order.
    ///
    /// Missing values are left out unless `zero_fill` is set, in which case
    /// they are sent as `"0"`.
    pub fn payload(&self, zero_fill: bool) -> Payload {
        let fields: [(&'static str, Option<f32>, usize); FEED_COUNT] = [
            ("temperature", self.temperature, 1),
            ("humidity", self.humidity, 1),
            ("sensor-voltage", self.sensor_voltage, 2),
            ("soil-percentage", self.soil_moisture_percent, 1),
        ];

        let mut payload = Payload::new();
        for (feed, value, precision) in fields {
            let mut text = FeedString::new();
            match value {
                // 16 bytes hold any value the sensors can produce
                Some(v) => write!(text, "{:.*}", precision, v).ok(),
                None if zero_fill => text.push('0').ok(),
                None => continue,
            };
            payload.push(FeedValue { feed, value: text }).ok();
        }
        payload
    }
}
