// src/common/accumulator.rs

use heapless::Vec;
use log::warn;

use super::error::SensorError;

/// Bounded buffer holding the bytes of one frame candidate across service calls.
///
/// The capacity `N` is the protocol's maximum frame length. Pushing into a full
/// accumulator is a modelled transition: the candidate is dropped, the
/// offending byte with it, and `BufferOverflow` is reported.
#[derive(Debug, Default)]
pub struct ByteAccumulator<const N: usize> {
    buf: Vec<u8, N>,
}

impl<const N: usize> ByteAccumulator<N> {
    pub const CAPACITY: usize = N;

    pub const fn new() -> Self {
        ByteAccumulator { buf: Vec::new() }
    }

    /// Appends a byte, resetting the candidate if it would exceed `N`.
    pub fn push(&mut self, byte: u8) -> Result<(), SensorError> {
        if self.buf.push(byte).is_err() {
            warn!("frame buffer overflow at {} bytes, clearing", N);
            self.buf.clear();
            return Err(SensorError::BufferOverflow { limit: N });
        }
        Ok(())
    }

    /// Removes up to `n` bytes from the front of the candidate.
    pub fn drop_front(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        let keep = self.buf.len() - n;
        self.buf.rotate_left(n);
        self.buf.truncate(keep);
    }

    /// Hands the candidate out and leaves the accumulator empty.
    pub fn take(&mut self) -> Vec<u8, N> {
        core::mem::take(&mut self.buf)
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }

    #[inline]
    pub fn first(&self) -> Option<u8> {
        self.buf.first().copied()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.buf.get(index).copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
