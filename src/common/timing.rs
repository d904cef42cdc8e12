// src/common/timing.rs

use core::time::Duration;

// All three sensors talk 9600 baud 8N1. Durations below are nominal; the
// drivers sample the clock once per service step, so every deadline is
// honoured with up to one step of latency.

// === Byte Timing at 9600 Baud (8N1) ===
// 1 start bit + 8 data bits + 1 stop bit = 10 bits per byte
// Time per byte = 10 / 9600 s = 1.0417 ms

/// Baud rate shared by every supported sensor.
pub const BAUD_RATE: u32 = 9600;
/// Nominal duration of a single byte (10 bits total) at 9600 baud.
pub const BYTE_DURATION: Duration = Duration::from_micros(1042);

/// Slack added on top of the nominal wire time when writing a command.
pub const WRITE_SLACK: Duration = Duration::from_millis(20);
/// Maximum wait for the transmit buffer to drain after a command.
pub const FLUSH_TIMEOUT: Duration = Duration::from_millis(10);

// === PM2005 Measurement Cycle ===

/// Interval between the starts of two measurement cycles.
pub const MEASUREMENT_INTERVAL: Duration = Duration::from_millis(60_000);
/// How long to wait for the open-measurement acknowledgement.
pub const OPEN_ACK_TIMEOUT: Duration = Duration::from_millis(1_000);
/// Fan/laser warm-up between a successful open and the first data read.
pub const WARMUP_DURATION: Duration = Duration::from_millis(36_000);
/// Gap between consecutive read commands within one measurement.
pub const READ_GAP: Duration = Duration::from_millis(500);

// === JX-CO2-102 Calibration ===

/// Absolute deadline for the full calibration response.
pub const CALIBRATION_TIMEOUT: Duration = Duration::from_millis(1_000);
/// Poll interval while waiting for calibration response bytes.
pub const CALIBRATION_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Time elapsed between two samples of a wrapping millisecond counter.
#[inline]
pub fn elapsed(now_ms: u32, since_ms: u32) -> Duration {
    Duration::from_millis(u64::from(now_ms.wrapping_sub(since_ms)))
}
