use embedded_hal_async::delay::DelayNs;
use log::{debug, warn};

use super::{ClimateSample, ClimateSensor, SensorError};
use crate::retry::{Outcome, RetryError, RetryPolicy, retry};

/// Read temperature and humidity, retrying until both values are present.
///
/// Returns [`ClimateSample::MISSING`] once `policy.attempts` measurements
/// failed. Non-transient sensor faults are returned to the caller.
pub async fn read_climate<S, D>(
    sensor: &mut S,
    delay: &mut D,
    policy: RetryPolicy,
) -> Result<ClimateSample, SensorError>
where
    S: ClimateSensor,
    D: DelayNs,
{
    let result = retry(policy, delay, async |attempt: u8| {
        debug!(
            "Reading from DHT sensor... Attempt {}/{}",
            attempt + 1,
            policy.attempts
        );

        match sensor.measure().await {
            Ok(sample) if sample.is_complete() => {
                debug!("Read from DHT successful");
                Outcome::Done(sample)
            }
            Ok(sample) => {
                debug!("Incomplete DHT sample: {:?}", sample);
                Outcome::Retry
            }
            Err(e) if e.is_transient() => {
                debug!("Failed to read DHT sensor: {:?}", e);
                Outcome::Retry
            }
            Err(e) => Outcome::Abort(e),
        }
    })
    .await;

    match result {
        Ok(sample) => Ok(sample),
        Err(RetryError::Exhausted) => {
            warn!(
                "Failed to get valid DHT readings after {} attempts",
                policy.attempts
            );
            Ok(ClimateSample::MISSING)
        }
        Err(RetryError::Aborted(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDelay;
    use embassy_futures::block_on;
    use std::collections::VecDeque;

    struct ScriptedSensor {
        script: VecDeque<Result<ClimateSample, SensorError>>,
        calls: usize,
    }

    impl ScriptedSensor {
        fn new(script: Vec<Result<ClimateSample, SensorError>>) -> Self {
            Self {
                script: script.into(),
                calls: 0,
            }
        }
    }

    impl ClimateSensor for ScriptedSensor {
        async fn measure(&mut self) -> Result<ClimateSample, SensorError> {
            self.calls += 1;
            self.script.pop_front().unwrap_or(Err(SensorError::Timeout))
        }
    }

    #[test]
    fn returns_first_complete_sample() {
        let mut sensor = ScriptedSensor::new(vec![
            Err(SensorError::Timeout),
            Ok(ClimateSample::new(21.5, 48.0)),
            Ok(ClimateSample::new(30.0, 10.0)),
        ]);
        let mut delay = RecordingDelay::default();

        let sample = block_on(read_climate(&mut sensor, &mut delay, RetryPolicy::new(3, 1_000)));

        assert_eq!(sample, Ok(ClimateSample::new(21.5, 48.0)));
        assert_eq!(sensor.calls, 2);
        assert_eq!(delay.delays_ms, vec![1_000]);
    }

    #[test]
    fn rejects_samples_with_a_missing_value() {
        let mut sensor = ScriptedSensor::new(vec![
            Ok(ClimateSample {
                temperature: Some(20.0),
                humidity: None,
            }),
            Ok(ClimateSample::new(20.0, 55.0)),
        ]);
        let mut delay = RecordingDelay::default();

        let sample = block_on(read_climate(&mut sensor, &mut delay, RetryPolicy::new(3, 1_000)));

        assert_eq!(sample, Ok(ClimateSample::new(20.0, 55.0)));
        assert_eq!(sensor.calls, 2);
    }

    #[test]
    fn gives_up_after_configured_attempts() {
        let mut sensor = ScriptedSensor::new(vec![]);
        let mut delay = RecordingDelay::default();

        let sample = block_on(read_climate(&mut sensor, &mut delay, RetryPolicy::new(5, 2_000)));

        assert_eq!(sample, Ok(ClimateSample::MISSING));
        assert_eq!(sensor.calls, 5);
        assert_eq!(delay.delays_ms.len(), 4);
    }

    #[test]
    fn unclassified_fault_escapes() {
        let mut sensor = ScriptedSensor::new(vec![Err(SensorError::Fault("driver state"))]);
        let mut delay = RecordingDelay::default();

        let sample = block_on(read_climate(&mut sensor, &mut delay, RetryPolicy::new(3, 1_000)));

        assert_eq!(sample, Err(SensorError::Fault("driver state")));
        assert_eq!(sensor.calls, 1);
    }
}
