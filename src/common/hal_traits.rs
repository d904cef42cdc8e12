// src/common/hal_traits.rs

use core::fmt::Debug;

/// Abstraction for the monotonic clock and cooperative delay the drivers need.
///
/// `now_ms` is a free-running millisecond counter (e.g. `millis()` on a
/// microcontroller). It may wrap; callers only ever look at differences.
pub trait SensorTimer {
    /// Current value of the monotonic millisecond counter.
    fn now_ms(&self) -> u32;

    /// Delay (or yield) for at least the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Abstraction for synchronous (non-blocking) UART communication with a sensor.
pub trait SensorSerial {
    /// Associated error type for communication errors.
    type Error: Debug;

    /// Attempts to read a single byte from the serial interface.
    ///
    /// Returns `Ok(byte)` if a byte was read, or `Err(nb::Error::WouldBlock)`
    /// if no byte is available yet. Other errors are returned as `Err(nb::Error::Other(Self::Error))`.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;

    /// Attempts to write a single byte to the serial interface.
    ///
    /// Returns `Ok(())` if the byte was accepted for transmission, or `Err(nb::Error::WouldBlock)`
    /// if the write buffer is full.
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Attempts to flush the transmit buffer, ensuring all written bytes have been sent.
    fn flush(&mut self) -> nb::Result<(), Self::Error>;
}
