//! Top-level read, upload and sleep loop.
//!
//! Every iteration runs the stages in order:
//!
//! 1. connect, when uploads are enabled and the link is down
//! 2. read the climate sensor and the soil probe
//! 3. upload the reading
//! 4. light sleep
//! 5. deep sleep, when enabled
//!
//! Faults in the first three stages are logged and never skip the sleep
//! stages. Returning from deep sleep is handled like a fresh boot: the loop
//! state is reset and the next iteration starts over from the connect stage.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::calibration::SoilCalibration;
use crate::config::Config;
use crate::constants::FAULT_SETTLE_DELAY_MS;
use crate::indicator::StatusLed;
use crate::network::{AssociationError, AssociationSettings, Station, associate};
use crate::power::PowerControl;
use crate::reading::Reading;
use crate::retry::RetryPolicy;
use crate::sensors::climate::read_climate;
use crate::sensors::soil::{SoilSampling, read_soil};
use crate::sensors::{ClimateSensor, MoistureProbe, SensorError};
use crate::telemetry::{FeedClient, UploadPolicy, UploadReport, upload};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub enable_sensors: bool,
    pub enable_deep_sleep: bool,
    pub send_data_to_net: bool,
    pub zero_fill_missing: bool,
    pub light_sleep_ms: u32,
    pub deep_sleep_ms: u32,
    pub climate_retry: RetryPolicy,
    pub soil_sampling: SoilSampling,
    pub calibration: SoilCalibration,
    pub association: AssociationSettings,
    pub upload: UploadPolicy,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        let soil_sampling = if config.soil_average {
            SoilSampling::Average {
                samples: config.soil_samples,
                delay_ms: config.soil_sample_delay_ms,
            }
        } else {
            SoilSampling::FirstValid {
                attempts: config.soil_samples,
                delay_ms: config.soil_sample_delay_ms,
            }
        };

        Self {
            enable_sensors: config.enable_sensors,
            enable_deep_sleep: config.enable_deep_sleep,
            send_data_to_net: config.send_data_to_net,
            zero_fill_missing: config.zero_fill_missing,
            light_sleep_ms: config.light_sleep_ms,
            deep_sleep_ms: config.deep_sleep_ms,
            climate_retry: RetryPolicy::new(config.dht_retries, config.dht_retry_delay_ms),
            soil_sampling,
            calibration: SoilCalibration::new(
                config.air_value,
                config.water_value,
                config.adc_max_raw,
                config.adc_gain,
            ),
            association: AssociationSettings {
                poll_interval_ms: config.wifi_poll_interval_ms,
                max_polls: config.wifi_max_polls,
            },
            upload: UploadPolicy::default(),
        }
    }
}

/// Hardware handles the duty cycle drives.
pub struct Board<C, M, S, F, P, L, D> {
    pub climate: C,
    pub probe: M,
    pub station: S,
    pub client: F,
    pub power: P,
    pub led: StatusLed<L>,
    pub delay: D,
}

/// What happened during one iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CycleReport {
    /// Iteration number since boot (or since the last deep sleep)
    pub cycle: u32,
    pub link_up: bool,
    pub reading: Option<Reading>,
    pub upload: Option<UploadReport>,
    pub connect_fault: Option<AssociationError>,
    pub read_fault: Option<SensorError>,
    pub deep_slept: bool,
}

pub struct DutyCycle<C, M, S, F, P, L, D> {
    settings: Settings,
    board: Board<C, M, S, F, P, L, D>,
    cycle: u32,
}

impl<C, M, S, F, P, L, D> DutyCycle<C, M, S, F, P, L, D>
where
    C: ClimateSensor,
    M: MoistureProbe,
    S: Station,
    F: FeedClient,
    P: PowerControl,
    L: OutputPin,
    D: DelayNs,
{
    pub fn new(settings: Settings, board: Board<C, M, S, F, P, L, D>) -> Self {
        Self {
            settings,
            board,
            cycle: 0,
        }
    }

    pub fn board(&self) -> &Board<C, M, S, F, P, L, D> {
        &self.board
    }

    pub async fn run(&mut self) -> ! {
        loop {
            self.run_once().await;
        }
    }

    pub async fn run_once(&mut self) -> CycleReport {
        let mut report = CycleReport {
            cycle: self.cycle,
            ..CycleReport::default()
        };
        debug!("Starting cycle {}", self.cycle);

        if self.settings.send_data_to_net {
            match self.connect().await {
                Ok(()) => report.link_up = true,
                Err(e) => report.connect_fault = Some(e),
            }
        }

        if self.settings.enable_sensors {
            match self.read().await {
                Ok(reading) => report.reading = Some(reading),
                Err(e) => report.read_fault = Some(e),
            }
        }

        if self.settings.send_data_to_net && report.link_up {
            if let Some(reading) = report.reading {
                report.upload = Some(self.upload(&reading).await);
            }
        }

        if let Some(e) = report.read_fault {
            error!("Unexpected error while reading sensors: {:?}", e);
        }

        if let Some(e) = report.connect_fault {
            error!("Wi-Fi issue: {:?}", e);
            self.board.delay.delay_ms(FAULT_SETTLE_DELAY_MS).await;
        }

        info!("Entering light sleep for {} ms", self.settings.light_sleep_ms);
        self.board.power.light_sleep(self.settings.light_sleep_ms);

        if self.settings.enable_deep_sleep {
            self.deep_sleep().await;
            report.deep_slept = true;
        } else {
            self.cycle = self.cycle.wrapping_add(1);
        }

        report
    }

    async fn connect(&mut self) -> Result<(), AssociationError> {
        let board = &mut self.board;
        associate(
            &mut board.station,
            &mut board.led,
            &mut board.delay,
            self.settings.association,
        )
        .await
    }

    /// Transient sensor errors are absorbed by the retries, only
    /// unclassified faults come back from here.
    async fn read(&mut self) -> Result<Reading, SensorError> {
        let board = &mut self.board;

        let climate = read_climate(
            &mut board.climate,
            &mut board.delay,
            self.settings.climate_retry,
        )
        .await?;

        let soil = read_soil(
            &mut board.probe,
            &mut board.delay,
            &self.settings.calibration,
            self.settings.soil_sampling,
        )
        .await?;

        let reading = Reading::new(climate, soil);
        info!(
            "Temperature: {:?} C, Humidity: {:?} %, Voltage: {:?} V, Soil: {:?} %",
            reading.temperature,
            reading.humidity,
            reading.sensor_voltage,
            reading.soil_moisture_percent
        );
        Ok(reading)
    }

    async fn upload(&mut self, reading: &Reading) -> UploadReport {
        let payload = reading.payload(self.settings.zero_fill_missing);
        if payload.is_empty() {
            warn!("Nothing to upload, every reading is missing");
            return UploadReport::default();
        }

        let report = upload(
            &mut self.board.client,
            &mut self.board.delay,
            &payload,
            self.settings.upload,
        )
        .await;
        if !report.is_complete() {
            warn!("{} of {} feeds failed", report.failed, payload.len());
        }
        report
    }

    async fn deep_sleep(&mut self) {
        info!("Entering deep sleep for {} ms", self.settings.deep_sleep_ms);
        self.board.station.disconnect().await;
        self.board.power.deep_sleep(self.settings.deep_sleep_ms);

        // Only reached where deep sleep returns instead of resetting the chip
        self.cycle = 0;
    }
}
