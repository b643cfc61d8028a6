use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

use crate::constants::LED_BLINK_MS;

/// On-board status LED. Pin errors are ignored, the LED is informational.
pub struct StatusLed<P> {
    pin: P,
    active_low: bool,
}

impl<P: OutputPin> StatusLed<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    /// For boards wiring the LED between VCC and the pin
    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }

    pub fn on(&mut self) {
        self.set(true);
    }

    pub fn off(&mut self) {
        self.set(false);
    }

    /// Flash `count` times, leaving the LED off.
    pub async fn blink<D: DelayNs>(&mut self, delay: &mut D, count: u8) {
        for _ in 0..count {
            self.on();
            delay.delay_ms(LED_BLINK_MS).await;
            self.off();
            delay.delay_ms(LED_BLINK_MS).await;
        }
    }

    fn set(&mut self, lit: bool) {
        let _ = if lit != self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
    }
}

#[cfg(test)]
impl<P> StatusLed<P> {
    pub(crate) fn pin(&self) -> &P {
        &self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingDelay, RecordingPin};
    use embassy_futures::block_on;

    #[test]
    fn blink_toggles_and_ends_off() {
        let mut led = StatusLed::new(RecordingPin::default());
        let mut delay = RecordingDelay::default();

        block_on(led.blink(&mut delay, 2));

        assert_eq!(led.pin.levels, vec![true, false, true, false]);
        assert_eq!(delay.delays_ms, vec![LED_BLINK_MS; 4]);
    }

    #[test]
    fn active_low_inverts_levels() {
        let mut led = StatusLed::active_low(RecordingPin::default());

        led.on();
        led.off();

        assert_eq!(led.pin.levels, vec![false, true]);
    }
}
