//! Polled mode button.
//!
//! ## Hardware
//!
//! Active-low momentary switch on an input with pull-up (BOOT button,
//! GPIO0, on the dev boards).  The main loop samples it once per pass.
//!
//! ## Edge detection
//!
//! A press is reported on the high → low transition, confirmed by a
//! second sample after a short settle delay.  Holding the button does not
//! repeat: the edge re-arms only after the input has been seen high again.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::warn;

pub const DEFAULT_SETTLE_MS: u32 = 30;

pub struct ButtonDriver<P> {
    pin: P,
    settle_ms: u32,
    last_high: bool,
}

impl<P: InputPin> ButtonDriver<P> {
    pub fn new(pin: P, settle_ms: u32) -> Self {
        Self {
            pin,
            settle_ms,
            last_high: true,
        }
    }

    /// Sample the input; `true` exactly once per confirmed press.
    pub fn poll(&mut self, delay: &mut impl DelayNs) -> bool {
        let high = self.read_high();
        let mut pressed = false;

        if self.last_high && !high {
            delay.delay_ms(self.settle_ms);
            pressed = !self.read_high();
        }

        self.last_high = high;
        pressed
    }

    /// Read errors count as "not pressed".
    fn read_high(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(level) => level,
            Err(e) => {
                warn!("button: read failed: {:?}", e);
                true
            }
        }
    }

    pub fn release(self) -> P {
        self.pin
    }
}
