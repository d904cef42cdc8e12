// src/common/error.rs

use core::fmt::Debug;

/// Broad classes of failure. Every frame-level failure is absorbed by the
/// drivers; the class only decides how it is reported.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Unexpected header byte or a candidate that outgrew its bound.
    Framing,
    /// Checksum mismatch.
    Integrity,
    /// Structurally valid, but the value or response is not acceptable.
    Semantic,
    /// A command/response deadline passed.
    Timing,
    /// The transport itself failed.
    Io,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SensorError<E = ()>
where
    E: Debug, // Needed for the generic Io error's format string
{
    /// Underlying I/O error from the transport implementation.
    #[error("I/O error: {0:?}")]
    Io(E),

    /// Operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// Frame candidate grew past the protocol bound and was discarded.
    #[error("Frame buffer overflow: limit {limit} bytes")]
    BufferOverflow { limit: usize },

    /// A frame did not start with the protocol's header byte.
    #[error("Unexpected header byte: {0:#04x}")]
    UnexpectedHeader(u8),

    /// Received frame format is invalid or undecodable.
    #[error("Invalid frame format")]
    InvalidFormat,

    /// Received checksum does not match the calculated one.
    #[error("Checksum mismatch: expected {expected:#04x}, received {received:#04x}")]
    ChecksumMismatch { expected: u8, received: u8 },

    /// Decoded value lies outside the sensor's documented range.
    #[error("Value out of range: {0}")]
    OutOfRange(i64),

    /// Sensor answered a calibration request with something other than the success response.
    #[error("Calibration rejected, received {received:02x?}")]
    CalibrationRejected { received: [u8; 9] },
}

impl<E: Debug> SensorError<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SensorError::Io(_) => ErrorKind::Io,
            SensorError::Timeout => ErrorKind::Timing,
            SensorError::BufferOverflow { .. }
            | SensorError::UnexpectedHeader(_)
            | SensorError::InvalidFormat => ErrorKind::Framing,
            SensorError::ChecksumMismatch { .. } => ErrorKind::Integrity,
            SensorError::OutOfRange(_) | SensorError::CalibrationRejected { .. } => {
                ErrorKind::Semantic
            }
        }
    }
}
