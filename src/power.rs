/// Low-power states the duty cycle ends in.
pub trait PowerControl {
    /// Suspend the CPU for `ms`, keeping RAM and peripherals.
    fn light_sleep(&mut self, ms: u32);

    /// Power down for `ms`. On the device this never returns: the chip
    /// restarts from reset when the timer fires.
    fn deep_sleep(&mut self, ms: u32);
}

#[cfg(feature = "esp32")]
pub use self::rtc::RtcPower;

#[cfg(feature = "esp32")]
mod rtc {
    use core::time::Duration;

    use esp_hal::rtc_cntl::{Rtc, sleep::TimerWakeupSource};
    use log::info;

    use super::PowerControl;

    /// Sleep modes driven by the RTC controller with a timer wakeup.
    pub struct RtcPower<'d> {
        rtc: Rtc<'d>,
    }

    impl<'d> RtcPower<'d> {
        pub fn new(rtc: Rtc<'d>) -> Self {
            Self { rtc }
        }
    }

    impl PowerControl for RtcPower<'_> {
        fn light_sleep(&mut self, ms: u32) {
            info!("Light sleep for {} ms", ms);
            let timer = TimerWakeupSource::new(Duration::from_millis(ms as u64));
            self.rtc.sleep_light(&[&timer]);
        }

        fn deep_sleep(&mut self, ms: u32) {
            info!("Deep sleep for {} ms", ms);
            let timer = TimerWakeupSource::new(Duration::from_millis(ms as u64));
            self.rtc.sleep_deep(&[&timer]);
        }
    }
}
