// src/sensor/five_in_one.rs

//! Five-in-one air quality module (VOC, formaldehyde, eCO2, temperature, humidity).
//!
//! The module streams a fixed 12-byte frame on its own, roughly once a second:
//!
//! | offset | field                              |
//! |--------|------------------------------------|
//! | 0      | header `0x2C`                      |
//! | 1..=2  | VOC, µg/m³                         |
//! | 3..=4  | formaldehyde, µg/m³                |
//! | 5..=6  | eCO2, ppm                          |
//! | 7..=8  | temperature, raw                   |
//! | 9..=10 | humidity, tenths of %RH            |
//! | 11     | inverted-sum checksum of 0..=10    |
//!
//! All fields are big-endian `u16`.

use log::{debug, trace};

use crate::common::{
    accumulator::ByteAccumulator,
    checksum::verify_inverted_sum,
    error::SensorError,
    frame::ValidatedFrame,
    hal_traits::SensorSerial,
    io_helpers::read_available,
    reading::{publish_subscribed, Reading, ReadingSink, Readings, Subscriptions},
};

use super::report_absorbed;

pub const HEADER: u8 = 0x2C;
pub const FRAME_LEN: usize = 12;

/// Fixed-size, header-anchored synchronizer for the 12-byte frame.
#[derive(Debug, Default)]
pub struct FiveInOneFramer {
    candidate: ByteAccumulator<FRAME_LEN>,
    hunting: bool,
}

impl FiveInOneFramer {
    pub const fn new() -> Self {
        FiveInOneFramer { candidate: ByteAccumulator::new(), hunting: false }
    }

    /// Feeds one byte.
    ///
    /// Returns `WouldBlock` until a complete candidate is available. A complete
    /// candidate always leaves the framer empty, whether it validates or not.
    /// The first byte of each run skipped while hunting for the header is
    /// reported as `UnexpectedHeader`.
    pub fn push(&mut self, byte: u8) -> nb::Result<ValidatedFrame<FRAME_LEN>, SensorError> {
        if self.candidate.is_empty() && byte != HEADER {
            trace!("five-in-one: skipping {:#04x} while hunting for header", byte);
            if core::mem::replace(&mut self.hunting, true) {
                return Err(nb::Error::WouldBlock);
            }
            return Err(nb::Error::Other(SensorError::UnexpectedHeader(byte)));
        }
        self.hunting = false;

        self.candidate.push(byte).map_err(nb::Error::Other)?;
        if self.candidate.len() < FRAME_LEN {
            return Err(nb::Error::WouldBlock);
        }

        let bytes = self.candidate.take();
        verify_inverted_sum::<()>(&bytes).map_err(nb::Error::Other)?;
        Ok(ValidatedFrame::new(bytes))
    }

    pub fn reset(&mut self) {
        self.candidate.reset();
        self.hunting = false;
    }

    pub fn buffered(&self) -> usize {
        self.candidate.len()
    }
}

/// Converts the raw temperature field to tenths of a degree Celsius.
///
/// Negative values are sent as `0xFFFF - magnitude`, so `0xFFFF` is 0 and
/// `0x8000` is the most negative value.
pub fn decode_temperature(raw: u16) -> i32 {
    if raw & 0x8000 != 0 {
        -(i32::from(0xFFFF - raw))
    } else {
        i32::from(raw)
    }
}

/// Decodes a validated frame into its five readings.
pub fn decode(frame: &ValidatedFrame<FRAME_LEN>) -> Readings {
    let mut readings = Readings::new();
    readings.extend([
        Reading::Voc(frame.be_u16(1)),
        Reading::Formaldehyde(frame.be_u16(3)),
        Reading::Eco2(frame.be_u16(5)),
        Reading::Temperature { deci_celsius: decode_temperature(frame.be_u16(7)) },
        Reading::Humidity { deci_percent: frame.be_u16(9) },
    ]);
    readings
}

/// Passive driver: the module transmits unprompted, so servicing only reads.
#[derive(Debug)]
pub struct FiveInOne {
    framer: FiveInOneFramer,
    subscriptions: Subscriptions,
}

impl FiveInOne {
    pub fn new(subscriptions: Subscriptions) -> Self {
        FiveInOne { framer: FiveInOneFramer::new(), subscriptions }
    }

    pub fn subscriptions(&self) -> Subscriptions {
        self.subscriptions
    }

    pub fn reset(&mut self) {
        self.framer.reset();
    }

    /// Consumes every available byte, publishing each decoded frame.
    pub fn service<IF, S>(&mut self, iface: &mut IF, sink: &mut S) -> Result<(), SensorError<IF::Error>>
    where
        IF: SensorSerial,
        S: ReadingSink,
    {
        read_available(iface, |byte| self.handle_byte(byte, sink))?;
        Ok(())
    }

    fn handle_byte<S: ReadingSink>(&mut self, byte: u8, sink: &mut S) {
        match self.framer.push(byte) {
            Ok(frame) => {
                let readings = decode(&frame);
                debug!("five-in-one: {:?}", readings.as_slice());
                publish_subscribed(self.subscriptions, &readings, sink);
            }
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => report_absorbed("five-in-one", &e),
        }
    }
}

/// Builds a valid frame from raw field values.
#[cfg(test)]
pub(crate) fn encode_frame(voc: u16, hcho: u16, eco2: u16, temp_raw: u16, humidity: u16) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = HEADER;
    for (i, field) in [voc, hcho, eco2, temp_raw, humidity].into_iter().enumerate() {
        frame[1 + 2 * i..3 + 2 * i].copy_from_slice(&field.to_be_bytes());
    }
    frame[11] = crate::common::checksum::inverted_sum(&frame[..11]);
    frame
}
