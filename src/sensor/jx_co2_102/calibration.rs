// src/sensor/jx_co2_102/calibration.rs

use core::time::Duration;
use log::{debug, warn};

use crate::common::{
    checksum::verify_additive,
    error::SensorError,
    hal_traits::{SensorSerial, SensorTimer},
    io_helpers::{drain_input, write_command},
    timing::{self, elapsed},
};

pub const FRAME_LEN: usize = 9;

/// Manual quick calibration to 400 ppm.
pub const CALIBRATE_COMMAND: [u8; FRAME_LEN] = [0xFF, 0x01, 0x05, 0x07, 0x00, 0x00, 0x00, 0x00, 0xF4];

/// The only response that means the calibration was applied.
pub const CALIBRATE_OK_RESPONSE: [u8; FRAME_LEN] =
    [0xFF, 0x01, 0x03, 0x07, 0x01, 0x00, 0x00, 0x00, 0xF5];

/// Fills `buf` from the transport, polling every `poll` until `timeout` has
/// passed since the call started.
pub(super) fn read_exact_with_deadline<IF>(
    iface: &mut IF,
    buf: &mut [u8],
    timeout: Duration,
    poll: Duration,
) -> Result<(), SensorError<IF::Error>>
where
    IF: SensorSerial + SensorTimer,
{
    let start_ms = iface.now_ms();
    let poll_ms = poll.as_millis() as u32;
    let mut pos = 0;

    while pos < buf.len() {
        match iface.read_byte() {
            Ok(byte) => {
                buf[pos] = byte;
                pos += 1;
            }
            Err(nb::Error::WouldBlock) => {
                if elapsed(iface.now_ms(), start_ms) >= timeout {
                    debug!("calibration: {} of {} response bytes before deadline", pos, buf.len());
                    return Err(SensorError::Timeout);
                }
                iface.delay_ms(poll_ms);
            }
            Err(nb::Error::Other(e)) => return Err(SensorError::Io(e)),
        }
    }
    Ok(())
}

/// Runs the zero-point calibration exchange.
///
/// Stale input is discarded first so the reply cannot be confused with a
/// half-read report line.
pub fn calibrate_zero<IF>(iface: &mut IF) -> Result<(), SensorError<IF::Error>>
where
    IF: SensorSerial + SensorTimer,
{
    drain_input(iface)?;
    write_command(iface, &CALIBRATE_COMMAND)?;

    let mut received = [0u8; FRAME_LEN];
    read_exact_with_deadline(
        iface,
        &mut received,
        timing::CALIBRATION_TIMEOUT,
        timing::CALIBRATION_POLL_INTERVAL,
    )?;

    if received != CALIBRATE_OK_RESPONSE {
        let well_formed = verify_additive::<()>(&received).is_ok();
        warn!(
            "calibration: expected {:02x?}, got {:02x?} ({})",
            CALIBRATE_OK_RESPONSE,
            received,
            if well_formed { "checksum valid" } else { "checksum invalid" }
        );
        return Err(SensorError::CalibrationRejected { received });
    }
    Ok(())
}
