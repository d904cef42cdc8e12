// src/sensor/jx_co2_102/parser.rs

use core::str;

use crate::common::error::SensorError;

/// Largest concentration the sensor reports, ppm.
pub const MAX_PPM: i64 = 50_000;

const UNIT: &str = "ppm";

/// Parses one ASCII report line such as `"  1235 ppm\r\n"` into ppm.
///
/// Leading and trailing whitespace or control characters are ignored, as is
/// anything after the unit. The number itself may carry a sign but nothing
/// else.
///
/// # Errors
///
/// * `InvalidFormat` if the line is not UTF-8, has no `ppm` unit, or the
///   text before the unit is not a base-10 integer.
/// * `OutOfRange` if the value is outside `0..=50000`.
pub fn parse_ascii_line(line: &[u8]) -> Result<u16, SensorError> {
    let text = str::from_utf8(line).map_err(|_| SensorError::<()>::InvalidFormat)?;
    let text = text.trim_matches(|c: char| c.is_ascii_whitespace() || c.is_ascii_control());

    let Some(unit_at) = text.find(UNIT) else {
        return Err(SensorError::InvalidFormat);
    };
    let number = text[..unit_at].trim_matches(|c: char| c == ' ' || c == '\t');

    let value: i64 = number.parse().map_err(|_| SensorError::<()>::InvalidFormat)?;
    if !(0..=MAX_PPM).contains(&value) {
        return Err(SensorError::OutOfRange(value));
    }
    // Bounded by MAX_PPM above
    Ok(value as u16)
}
