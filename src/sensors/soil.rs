use embedded_hal_async::delay::DelayNs;
use log::{debug, warn};

use super::{MoistureProbe, SensorError, SoilReading};
use crate::calibration::SoilCalibration;
use crate::retry::{Outcome, RetryError, RetryPolicy, retry};

/// How the probe is sampled each cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoilSampling {
    /// Average every valid sample out of `samples`
    Average { samples: u8, delay_ms: u32 },
    /// Keep the first valid sample out of up to `attempts`
    FirstValid { attempts: u8, delay_ms: u32 },
}

pub async fn read_soil<P, D>(
    probe: &mut P,
    delay: &mut D,
    calibration: &SoilCalibration,
    sampling: SoilSampling,
) -> Result<SoilReading, SensorError>
where
    P: MoistureProbe,
    D: DelayNs,
{
    match sampling {
        SoilSampling::Average { samples, delay_ms } => {
            read_average(probe, delay, calibration, samples, delay_ms).await
        }
        SoilSampling::FirstValid { attempts, delay_ms } => {
            read_first_valid(probe, delay, calibration, RetryPolicy::new(attempts, delay_ms)).await
        }
    }
}

/// Average `samples` raw readings, skipping the ones that fail.
///
/// With no valid sample the reading is missing. Non-transient probe faults
/// are returned to the caller.
pub async fn read_average<P, D>(
    probe: &mut P,
    delay: &mut D,
    calibration: &SoilCalibration,
    samples: u8,
    delay_ms: u32,
) -> Result<SoilReading, SensorError>
where
    P: MoistureProbe,
    D: DelayNs,
{
    let mut total: u32 = 0;
    let mut valid: u32 = 0;

    for sample in 0..samples {
        debug!("Reading from ADC...");
        match probe.sample() {
            Ok(Some(raw)) => {
                debug!("Raw ADC value: {}", raw);
                total += raw as u32;
                valid += 1;
            }
            Ok(None) => debug!("ADC returned no value"),
            Err(e) if e.is_transient() => warn!("Failed to read ADC sensor: {:?}", e),
            Err(e) => return Err(e),
        }

        // Spread samples out to reduce noise
        if sample + 1 < samples {
            delay.delay_ms(delay_ms).await;
        }
    }

    if valid == 0 {
        warn!("No valid ADC samples out of {}", samples);
        return Ok(SoilReading::MISSING);
    }

    let average = total as f32 / valid as f32;
    debug!("Average ADC value: {}", average);

    Ok(convert(calibration, average))
}

/// Keep the first valid raw reading.
pub async fn read_first_valid<P, D>(
    probe: &mut P,
    delay: &mut D,
    calibration: &SoilCalibration,
    policy: RetryPolicy,
) -> Result<SoilReading, SensorError>
where
    P: MoistureProbe,
    D: DelayNs,
{
    let result = retry(policy, delay, async |_attempt: u8| {
        debug!("Reading from ADC...");
        match probe.sample() {
            Ok(Some(raw)) => {
                debug!("Raw ADC value: {}", raw);
                Outcome::Done(raw)
            }
            Ok(None) => Outcome::Retry,
            Err(e) if e.is_transient() => {
                warn!("Failed to read ADC sensor: {:?}", e);
                Outcome::Retry
            }
            Err(e) => Outcome::Abort(e),
        }
    })
    .await;

    match result {
        Ok(raw) => Ok(convert(calibration, raw as f32)),
        Err(RetryError::Exhausted) => Ok(SoilReading::MISSING),
        Err(RetryError::Aborted(e)) => Err(e),
    }
}

fn convert(calibration: &SoilCalibration, raw: f32) -> SoilReading {
    SoilReading {
        sensor_voltage: Some(calibration.voltage(raw)),
        moisture_percent: Some(calibration.moisture_percent(raw)),
    }
}
