// src/common/frame.rs

use heapless::Vec;

use super::timing::BAUD_RATE;

/// Represents the serial frame formats used by the supported sensors.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameFormat {
    /// 8 data bits, No parity, 1 stop bit.
    Uart8N1,
}

/// UART line settings a transport must be configured with.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub format: FrameFormat,
}

impl SerialSettings {
    /// 9600 baud 8N1, used by every sensor in this crate.
    pub const SENSOR_UART: SerialSettings = SerialSettings {
        baud_rate: BAUD_RATE,
        format: FrameFormat::Uart8N1,
    };
}

/// A complete frame that passed the protocol's length and checksum rules.
///
/// Only the synchronizers in this crate can build one, so holding a
/// `ValidatedFrame` is proof the bytes are well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFrame<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> ValidatedFrame<N> {
    pub(crate) fn new(bytes: Vec<u8, N>) -> Self {
        ValidatedFrame { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Big-endian `u16` at `offset`. Callers index within the validated length.
    #[inline]
    pub(crate) fn be_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    /// Big-endian `u32` at `offset`. Callers index within the validated length.
    #[inline]
    pub(crate) fn be_u32(&self, offset: usize) -> u32 {
        u32::from_be_bytes([
            self.bytes[offset],
            self.bytes[offset + 1],
            self.bytes[offset + 2],
            self.bytes[offset + 3],
        ])
    }
}
