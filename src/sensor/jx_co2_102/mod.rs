// src/sensor/jx_co2_102/mod.rs

//! JX-CO2-102 infrared CO2 sensor.
//!
//! In its default mode the sensor prints one ASCII line per reading, e.g.
//! `"  1235 ppm\r\n"`. The binary command set is only used for calibration.

pub mod calibration;
pub mod parser;

use log::{debug, info, warn};

use crate::common::{
    accumulator::ByteAccumulator,
    error::SensorError,
    frame::ValidatedFrame,
    hal_traits::{SensorSerial, SensorTimer},
    io_helpers::read_available,
    reading::{publish_subscribed, Reading, ReadingSink, Subscriptions},
};

use super::report_absorbed;
pub use parser::parse_ascii_line;

/// Longest line kept; a longer candidate is discarded.
pub const MAX_LINE_LEN: usize = 20;
pub const LINE_TERMINATOR: u8 = b'\n';

/// Delimiter-terminated line synchronizer.
#[derive(Debug, Default)]
pub struct LineFramer {
    candidate: ByteAccumulator<MAX_LINE_LEN>,
}

impl LineFramer {
    pub const fn new() -> Self {
        LineFramer { candidate: ByteAccumulator::new() }
    }

    /// Feeds one byte; yields the line, terminator included, once `\n` arrives.
    pub fn push(&mut self, byte: u8) -> nb::Result<ValidatedFrame<MAX_LINE_LEN>, SensorError> {
        self.candidate.push(byte).map_err(nb::Error::Other)?;
        if byte != LINE_TERMINATOR {
            return Err(nb::Error::WouldBlock);
        }
        Ok(ValidatedFrame::new(self.candidate.take()))
    }

    pub fn reset(&mut self) {
        self.candidate.reset();
    }

    pub fn buffered(&self) -> usize {
        self.candidate.len()
    }
}

#[derive(Debug)]
pub struct JxCo2102 {
    framer: LineFramer,
    subscriptions: Subscriptions,
    warning: bool,
}

impl JxCo2102 {
    pub fn new(subscriptions: Subscriptions) -> Self {
        JxCo2102 { framer: LineFramer::new(), subscriptions, warning: false }
    }

    pub fn subscriptions(&self) -> Subscriptions {
        self.subscriptions
    }

    /// Set by a failed calibration, cleared by a successful one.
    pub fn has_warning(&self) -> bool {
        self.warning
    }

    pub fn reset(&mut self) {
        self.framer.reset();
    }

    /// Consumes every available byte, publishing each valid line.
    pub fn service<IF, S>(&mut self, iface: &mut IF, sink: &mut S) -> Result<(), SensorError<IF::Error>>
    where
        IF: SensorSerial,
        S: ReadingSink,
    {
        read_available(iface, |byte| self.handle_byte(byte, sink))?;
        Ok(())
    }

    fn handle_byte<S: ReadingSink>(&mut self, byte: u8, sink: &mut S) {
        let parsed = match self.framer.push(byte) {
            Ok(line) => parse_ascii_line(line.as_bytes()),
            Err(nb::Error::WouldBlock) => return,
            Err(nb::Error::Other(e)) => Err(e),
        };
        match parsed {
            Ok(ppm) => {
                debug!("jx-co2-102: CO2 {} ppm", ppm);
                publish_subscribed(self.subscriptions, &[Reading::Co2(ppm)], sink);
            }
            Err(e) => report_absorbed("jx-co2-102", &e),
        }
    }

    /// Calibrates the sensor's zero point to 400 ppm.
    ///
    /// Blocks for at most [`CALIBRATION_TIMEOUT`] plus the command write. The
    /// sensor should have been running for ten minutes or more in fresh
    /// outdoor air. Any partial report line is discarded.
    ///
    /// [`CALIBRATION_TIMEOUT`]: crate::common::timing::CALIBRATION_TIMEOUT
    pub fn calibrate_zero<IF>(&mut self, iface: &mut IF) -> Result<(), SensorError<IF::Error>>
    where
        IF: SensorSerial + SensorTimer,
    {
        info!("jx-co2-102: starting manual calibration to 400 ppm");
        info!("jx-co2-102: sensor must have run 10+ minutes in outdoor or well-ventilated air");

        let result = calibration::calibrate_zero(iface);
        self.framer.reset();

        match &result {
            Ok(()) => {
                self.warning = false;
                info!("jx-co2-102: calibration successful");
            }
            Err(e) => {
                self.warning = true;
                warn!("jx-co2-102: calibration failed ({:?}): {}", e.kind(), e);
            }
        }
        result
    }
}
