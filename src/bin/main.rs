#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use embassy_executor::Spawner;
use embassy_time::{Delay, Duration, Timer};
use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay as BlockingDelay;
use esp_hal::gpio::{DriveMode, Flex, Level, Output, OutputConfig, Pull};
use esp_hal::rng::Rng;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::timer::timg::TimerGroup;
use esp_println::logger::init_logger;
use esp_radio::Controller;
use log::{LevelFilter, info};
use static_cell::ConstStaticCell;

use esp32_soil_sensor::board::AdcProbe;
use esp32_soil_sensor::config::CONFIG;
use esp32_soil_sensor::constants::{HEAP_SIZE, VERSION};
use esp32_soil_sensor::duty_cycle::{Board, DutyCycle, Settings};
use esp32_soil_sensor::indicator::StatusLed;
use esp32_soil_sensor::power::RtcPower;
use esp32_soil_sensor::sensors::dht::Dht;
use esp32_soil_sensor::telemetry::adafruit::AdafruitIo;
use esp32_soil_sensor::transport::Buffers;
use esp32_soil_sensor::wifi::Wifi;

macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write($val);
        x
    }};
}

esp_bootloader_esp_idf::esp_app_desc!();

static BUFFERS: ConstStaticCell<Buffers> = ConstStaticCell::new(Buffers::new());

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    init_logger(if CONFIG.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });
    info!("Soil sensor v{} ({})", VERSION, CONFIG.device_id);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(size: HEAP_SIZE);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // possibly high transient required at init
    // https://github.com/esp-rs/esp-hal/issues/1626
    Timer::after(Duration::from_millis(1000)).await;

    let led = StatusLed::new(Output::new(
        peripherals.GPIO2,
        Level::Low,
        OutputConfig::default(),
    ));

    // DHT data line: open drain with pull-up, driven low to start a read
    let mut dht_pin = Flex::new(peripherals.GPIO4);
    dht_pin.apply_output_config(
        &OutputConfig::default()
            .with_drive_mode(DriveMode::OpenDrain)
            .with_pull(Pull::Up),
    );
    dht_pin.set_input_enable(true);
    dht_pin.set_output_enable(true);
    let climate = Dht::new(dht_pin, BlockingDelay::new(), CONFIG.dht_model);

    let mut adc_config = AdcConfig::new();
    let soil_pin = adc_config.enable_pin(peripherals.GPIO34, Attenuation::_11dB);
    let probe = AdcProbe::new(Adc::new(peripherals.ADC1, adc_config), soil_pin);

    let power = RtcPower::new(Rtc::new(peripherals.LPWR));

    let rng = Rng::new();
    let mut seed = [0u8; 32];
    for chunk in seed.chunks_mut(4) {
        chunk.copy_from_slice(&rng.random().to_le_bytes());
    }

    let radio_init = &*mk_static!(
        Controller<'static>,
        esp_radio::init().expect("Failed to init radio")
    );
    let wifi = Wifi::new(radio_init, peripherals.WIFI, rng, spawner)
        .await
        .expect("Failed to initialize Wi-Fi");

    let client = AdafruitIo::new(
        wifi.stack,
        seed,
        BUFFERS.take(),
        CONFIG.aio_host,
        CONFIG.aio_port,
        CONFIG.aio_username,
        CONFIG.aio_key,
        CONFIG.tls_ca,
    );

    let mut duty_cycle = DutyCycle::new(
        Settings::from(&CONFIG),
        Board {
            climate,
            probe,
            station: wifi,
            client,
            power,
            led,
            delay: Delay,
        },
    );

    duty_cycle.run().await
}
