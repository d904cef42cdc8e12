// src/common/adapter.rs

use embedded_hal::delay::DelayNs;
use embedded_hal_nb::serial::{ErrorType, Read, Write};

use super::hal_traits::{SensorSerial, SensorTimer};

/// Bridges `embedded-hal` peripherals to the crate's transport traits.
///
/// `uart` must already be configured for [`SerialSettings::SENSOR_UART`].
/// `clock` returns a free-running millisecond counter.
///
/// [`SerialSettings::SENSOR_UART`]: super::frame::SerialSettings::SENSOR_UART
pub struct NativeAdapter<U, D, C> {
    uart: U,
    delay: D,
    clock: C,
}

impl<U, D, C> NativeAdapter<U, D, C>
where
    U: Read<u8> + Write<u8>,
    D: DelayNs,
    C: Fn() -> u32,
{
    pub fn new(uart: U, delay: D, clock: C) -> Self {
        NativeAdapter { uart, delay, clock }
    }

    /// Gives the peripherals back.
    pub fn release(self) -> (U, D, C) {
        (self.uart, self.delay, self.clock)
    }
}

impl<U, D, C> SensorSerial for NativeAdapter<U, D, C>
where
    U: Read<u8> + Write<u8>,
{
    type Error = <U as ErrorType>::Error;

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        self.uart.read()
    }

    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.uart.write(byte)
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Write::flush(&mut self.uart)
    }
}

impl<U, D, C> SensorTimer for NativeAdapter<U, D, C>
where
    D: DelayNs,
    C: Fn() -> u32,
{
    fn now_ms(&self) -> u32 {
        (self.clock)()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
