/// Map `x` linearly from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// Inverted ranges are allowed. A degenerate input range maps to `out_min`.
pub fn map_value(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    if in_max == in_min {
        return out_min;
    }
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// The probe reads high in air and low in water, so `air_value` is usually
/// the larger bound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoilCalibration {
    /// Raw reading with the probe in dry air (0 %)
    pub air_value: u16,
    /// Raw reading with the probe submerged (100 %)
    pub water_value: u16,
    /// Full-scale raw ADC value
    pub adc_max_raw: u16,
    /// Voltage divider gain
    pub voltage_gain: f32,
}

impl SoilCalibration {
    pub const fn new(air_value: u16, water_value: u16, adc_max_raw: u16, voltage_gain: f32) -> Self {
        Self {
            air_value,
            water_value,
            adc_max_raw,
            voltage_gain,
        }
    }

    /// Probe voltage for a (possibly averaged) raw reading
    pub fn voltage(&self, raw: f32) -> f32 {
        raw * (1.0 / self.adc_max_raw as f32) * self.voltage_gain
    }

    /// Soil moisture in percent, clamped to 0..=100
    pub fn moisture_percent(&self, raw: f32) -> f32 {
        map_value(
            raw,
            self.air_value as f32,
            self.water_value as f32,
            0.0,
            100.0,
        )
        .clamp(0.0, 100.0)
    }
}

impl Default for SoilCalibration {
    fn default() -> Self {
        Self::new(615, 320, 1023, 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn calibration_endpoints_map_to_zero_and_hundred() {
        let cal = SoilCalibration::default();
        assert!(close(cal.moisture_percent(615.0), 0.0));
        assert!(close(cal.moisture_percent(320.0), 100.0));
    }

    #[test]
    fn interpolates_linearly_inside_inverted_range() {
        let cal = SoilCalibration::default();
        let midpoint = (615.0 + 320.0) / 2.0;
        assert!(close(cal.moisture_percent(midpoint), 50.0));

        let mut previous = cal.moisture_percent(615.0);
        for raw in (320..615).rev() {
            let percent = cal.moisture_percent(raw as f32);
            assert!(percent >= previous);
            previous = percent;
        }
    }

    #[test]
    fn clamps_outside_calibrated_range() {
        let cal = SoilCalibration::default();
        assert_eq!(cal.moisture_percent(1023.0), 0.0);
        assert_eq!(cal.moisture_percent(0.0), 100.0);
    }

    #[test]
    fn map_value_matches_standard_formula() {
        assert!(close(map_value(5.0, 0.0, 10.0, 0.0, 100.0), 50.0));
        assert!(close(map_value(2.0, 0.0, 10.0, 10.0, 20.0), 12.0));
        assert_eq!(map_value(7.0, 3.0, 3.0, 0.0, 100.0), 0.0);
    }

    #[test]
    fn voltage_scales_full_range() {
        let cal = SoilCalibration::default();
        assert!(close(cal.voltage(1023.0), 3.0));
        assert_eq!(cal.voltage(0.0), 0.0);
    }
}
