// src/common/checksum.rs

use super::error::SensorError;

/// Wrapping 8-bit sum of `data`.
#[inline]
pub fn sum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Inverted-sum checksum used by the five-in-one module.
///
/// `(!sum + 1) mod 256` over every byte before the checksum.
#[inline]
pub fn inverted_sum(data: &[u8]) -> u8 {
    (!sum8(data)).wrapping_add(1)
}

/// Additive checksum used by PM2005 (both directions) and the JX-CO2-102
/// command set: `(256 - sum) mod 256`, so a complete frame sums to zero.
#[inline]
pub fn additive_checksum(data: &[u8]) -> u8 {
    0u8.wrapping_sub(sum8(data))
}

/// Verifies a frame whose last byte is an inverted-sum checksum of the rest.
///
/// # Returns
///
/// * `Ok(())` if the checksum is valid.
/// * `Err(SensorError::InvalidFormat)` if the buffer has no checksum byte.
/// * `Err(SensorError::ChecksumMismatch)` if the checksums don't match.
pub fn verify_inverted_sum<E>(frame: &[u8]) -> Result<(), SensorError<E>>
where
    E: core::fmt::Debug,
{
    let (received, data) = frame.split_last().ok_or(SensorError::<E>::InvalidFormat)?;
    let expected = inverted_sum(data);
    if expected == *received {
        Ok(())
    } else {
        Err(SensorError::ChecksumMismatch { expected, received: *received })
    }
}

/// Verifies a frame whose last byte is an additive checksum of the rest.
///
/// Equivalent to the whole frame summing to zero modulo 256.
pub fn verify_additive<E>(frame: &[u8]) -> Result<(), SensorError<E>>
where
    E: core::fmt::Debug,
{
    let (received, data) = frame.split_last().ok_or(SensorError::<E>::InvalidFormat)?;
    let expected = additive_checksum(data);
    if expected == *received {
        Ok(())
    } else {
        Err(SensorError::ChecksumMismatch { expected, received: *received })
    }
}
