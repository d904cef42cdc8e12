// src/common/io_helpers.rs

use core::time::Duration;

use log::trace;
use nb::Result as NbResult;

use super::{
    error::SensorError,
    hal_traits::{SensorSerial, SensorTimer},
    timing::{self, elapsed},
};

/// Back-off between retries of an operation that returned `WouldBlock`.
const IO_RETRY_DELAY_MS: u32 = 1;

/// Upper bound on bytes discarded by a single [`drain_input`] call, so a
/// transport that never runs dry cannot stall the caller.
pub const DRAIN_LIMIT: usize = 256;

/// Executes a non-blocking I/O operation (`f`) repeatedly until it
/// stops returning `WouldBlock`, returning the final result or a timeout error.
pub fn execute_blocking_io_with_timeout<IF, FN, T>(
    iface: &mut IF,
    timeout: Duration,
    mut f: FN,
) -> Result<T, SensorError<IF::Error>>
where
    IF: SensorSerial + SensorTimer,
    FN: FnMut(&mut IF) -> NbResult<T, IF::Error>,
{
    let start_ms = iface.now_ms();

    loop {
        match f(iface) {
            Ok(result) => return Ok(result),
            Err(nb::Error::WouldBlock) => {
                if elapsed(iface.now_ms(), start_ms) >= timeout {
                    return Err(SensorError::Timeout);
                }
                iface.delay_ms(IO_RETRY_DELAY_MS);
            }
            Err(nb::Error::Other(e)) => return Err(SensorError::Io(e)),
        }
    }
}

/// Writes a fully formatted command frame and waits for it to leave the transmit buffer.
pub fn write_command<IF>(iface: &mut IF, cmd_bytes: &[u8]) -> Result<(), SensorError<IF::Error>>
where
    IF: SensorSerial + SensorTimer,
{
    trace!("tx {:02x?}", cmd_bytes);

    let write_duration = timing::BYTE_DURATION * cmd_bytes.len() as u32;
    let write_timeout = write_duration + timing::WRITE_SLACK;

    for byte in cmd_bytes {
        execute_blocking_io_with_timeout(iface, write_timeout, |iface| iface.write_byte(*byte))?;
    }

    execute_blocking_io_with_timeout(iface, timing::FLUSH_TIMEOUT, |iface| iface.flush())
}

/// Hands every byte that is already available to `on_byte`, stopping at the
/// first `WouldBlock`. Never waits for input.
///
/// Returns the number of bytes consumed.
pub fn read_available<IF, FN>(iface: &mut IF, mut on_byte: FN) -> Result<usize, SensorError<IF::Error>>
where
    IF: SensorSerial,
    FN: FnMut(u8),
{
    let mut consumed = 0;
    loop {
        match iface.read_byte() {
            Ok(byte) => {
                consumed += 1;
                on_byte(byte);
            }
            Err(nb::Error::WouldBlock) => return Ok(consumed),
            Err(nb::Error::Other(e)) => return Err(SensorError::Io(e)),
        }
    }
}

/// Reads and discards whatever is already waiting in the receive buffer.
///
/// Returns the number of bytes dropped.
pub fn drain_input<IF>(iface: &mut IF) -> Result<usize, SensorError<IF::Error>>
where
    IF: SensorSerial,
{
    let mut dropped = 0;
    while dropped < DRAIN_LIMIT {
        match iface.read_byte() {
            Ok(_) => dropped += 1,
            Err(nb::Error::WouldBlock) => break,
            Err(nb::Error::Other(e)) => return Err(SensorError::Io(e)),
        }
    }
    if dropped > 0 {
        trace!("drained {} stale bytes", dropped);
    }
    Ok(dropped)
}
