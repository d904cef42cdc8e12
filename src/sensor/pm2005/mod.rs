// src/sensor/pm2005/mod.rs

//! PM2005 laser particle sensor, driven in polling mode.
//!
//! The host opens a measurement, lets the fan and laser warm up, then reads
//! particle counts and mass concentration in turn. See [`CommandSequencer`]
//! for the cycle and [`protocol`] for the wire format.

pub mod protocol;
pub mod sequencer;

use log::{debug, warn};

use crate::common::{
    error::SensorError,
    hal_traits::{SensorSerial, SensorTimer},
    io_helpers::{read_available, write_command},
    reading::{publish_subscribed, ReadingSink, Subscriptions},
};

use super::report_absorbed;
use protocol::{decode, Pm2005Framer, Response, OPEN_ACK_OK};
pub use protocol::{Command, ReadKind};
pub use sequencer::{CommandSequencer, MeasuringPhase, SequencerState, SequencerTimings};

#[derive(Debug)]
pub struct Pm2005 {
    framer: Pm2005Framer,
    sequencer: CommandSequencer,
    subscriptions: Subscriptions,
}

impl Pm2005 {
    pub fn new(now_ms: u32, subscriptions: Subscriptions, timings: SequencerTimings) -> Self {
        Pm2005 {
            framer: Pm2005Framer::new(),
            sequencer: CommandSequencer::new(now_ms, timings),
            subscriptions,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.sequencer.state()
    }

    pub fn timings(&self) -> &SequencerTimings {
        self.sequencer.timings()
    }

    pub fn subscriptions(&self) -> Subscriptions {
        self.subscriptions
    }

    /// Drops any partial frame; the measurement cycle is unaffected.
    pub fn reset(&mut self) {
        self.framer.reset();
    }

    /// One cooperative step: consume available bytes, then advance the cycle.
    ///
    /// The clock is sampled once; every transition in this step uses that sample.
    pub fn service<IF, S>(&mut self, iface: &mut IF, sink: &mut S) -> Result<(), SensorError<IF::Error>>
    where
        IF: SensorSerial + SensorTimer,
        S: ReadingSink,
    {
        let now_ms = iface.now_ms();

        read_available(iface, |byte| self.handle_byte(byte, now_ms, sink))?;

        if let Some(command) = self.sequencer.poll(now_ms) {
            let frame = command.encode::<IF::Error>()?;
            write_command(iface, &frame)?;
        }
        Ok(())
    }

    fn handle_byte<S: ReadingSink>(&mut self, byte: u8, now_ms: u32, sink: &mut S) {
        match self.framer.push(byte) {
            Ok(frame) => {
                let response = decode(&frame, self.sequencer.pending_read());
                self.handle_response(response, now_ms, sink);
            }
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => report_absorbed("pm2005", &e),
        }
    }

    fn handle_response<S: ReadingSink>(&mut self, response: Response, now_ms: u32, sink: &mut S) {
        match response {
            Response::OpenAck { status: OPEN_ACK_OK } => {
                self.sequencer.on_open_ack(now_ms);
            }
            Response::OpenAck { status } => {
                warn!("pm2005: open command rejected with status {:#04x}", status);
            }
            Response::Particles { .. } | Response::Mass { .. } => {
                if !self.sequencer.read_outstanding() {
                    debug!(
                        "pm2005: read response in {:?} with no read outstanding, decoded as {:?}",
                        self.sequencer.state(),
                        self.sequencer.pending_read()
                    );
                }
                debug!("pm2005: {:?}", response);
                publish_subscribed(self.subscriptions, &response.readings(), sink);
            }
            Response::Ignored { command, declared_len } => {
                debug!(
                    "pm2005: ignoring frame, command {:02x?}, declared length {}",
                    command, declared_len
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{
        mock::{MockCommError, MockInterface},
        reading::{Channel, Reading},
    };
    use protocol::{encode_response, read_response, CMD_OPEN_CLOSE};

    const OPEN: [u8; 6] = [0x11, 0x03, 0x0C, 0x02, 0x1E, 0xC0];
    const READ_PARTICLES: [u8; 4] = [0x11, 0x01, 0x0B, 0xE3];
    const READ_MASS: [u8; 5] = [0x11, 0x02, 0x0B, 0x01, 0xE1];

    fn ack() -> Vec<u8> {
        encode_response(&[CMD_OPEN_CLOSE, OPEN_ACK_OK])
    }

    fn step(driver: &mut Pm2005, iface: &mut MockInterface, at_ms: u32, sink: &mut Vec<Reading>) {
        iface.set_time(at_ms);
        driver
            .service(iface, &mut |r| sink.push(r))
            .expect("service should not fail");
    }

    #[test]
    fn test_full_cycle_over_the_wire() {
        let mut iface = MockInterface::new();
        let mut driver = Pm2005::new(0, Subscriptions::all(), SequencerTimings::default());
        let mut got = Vec::new();

        step(&mut driver, &mut iface, 59_999, &mut got);
        assert!(iface.written().is_empty());

        step(&mut driver, &mut iface, 60_000, &mut got);
        assert_eq!(iface.written(), &OPEN);
        assert_eq!(driver.state(), SequencerState::AwaitingOpenAck);
        iface.clear_written();

        iface.stage_read_data_at(60_500, &ack());
        step(&mut driver, &mut iface, 60_500, &mut got);
        assert_eq!(driver.state(), SequencerState::Measuring(MeasuringPhase::Warmup));

        step(&mut driver, &mut iface, 96_500, &mut got);
        assert_eq!(iface.written(), &READ_PARTICLES);
        iface.clear_written();

        iface.stage_read_data(&read_response([5_000, 800, 20, 0]));
        step(&mut driver, &mut iface, 96_800, &mut got);
        assert_eq!(
            got,
            vec![Reading::Particles0p5(5_000), Reading::Particles2p5(800), Reading::Particles10(20)]
        );
        got.clear();

        step(&mut driver, &mut iface, 97_000, &mut got);
        assert_eq!(iface.written(), &READ_MASS);
        iface.clear_written();

        iface.stage_read_data(&read_response([12, 35, 0, 0]));
        step(&mut driver, &mut iface, 97_200, &mut got);
        assert_eq!(got, vec![Reading::Pm2p5Mass(12), Reading::Pm10Mass(35)]);

        step(&mut driver, &mut iface, 97_500, &mut got);
        assert_eq!(driver.state(), SequencerState::Idle);
        assert!(iface.written().is_empty());
    }

    #[test]
    fn test_ack_timeout_without_response() {
        let mut iface = MockInterface::new();
        let mut driver = Pm2005::new(0, Subscriptions::all(), SequencerTimings::default());
        let mut got = Vec::new();

        step(&mut driver, &mut iface, 60_000, &mut got);
        step(&mut driver, &mut iface, 61_000, &mut got);
        assert_eq!(driver.state(), SequencerState::Idle);
    }

    #[test]
    fn test_rejected_ack_keeps_waiting() {
        let mut iface = MockInterface::new();
        let mut driver = Pm2005::new(0, Subscriptions::all(), SequencerTimings::default());
        let mut got = Vec::new();

        step(&mut driver, &mut iface, 60_000, &mut got);
        iface.stage_read_data(&encode_response(&[CMD_OPEN_CLOSE, 0x01]));
        step(&mut driver, &mut iface, 60_200, &mut got);
        assert_eq!(driver.state(), SequencerState::AwaitingOpenAck);
    }

    #[test]
    fn test_corrupt_and_ignored_frames_are_absorbed() {
        let mut iface = MockInterface::new();
        let mut driver = Pm2005::new(0, Subscriptions::all(), SequencerTimings::default());
        let mut got = Vec::new();

        let mut corrupt = read_response([1, 2, 3, 4]);
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0x55;
        iface.stage_read_data(&[0x00, 0x42]);
        iface.stage_read_data(&corrupt);
        iface.stage_read_data(&encode_response(&[0x33, 0x00]));
        iface.stage_read_data(&read_response([7, 8, 9, 0]));
        step(&mut driver, &mut iface, 1_000, &mut got);

        assert_eq!(got, vec![Reading::Particles0p5(7), Reading::Particles2p5(8), Reading::Particles10(9)]);
    }

    #[test]
    fn test_subscriptions_filter_channels() {
        let mut iface = MockInterface::new();
        let subs = Subscriptions::none().with(Channel::Particles2p5);
        let mut driver = Pm2005::new(0, subs, SequencerTimings::default());
        let mut got = Vec::new();

        iface.stage_read_data(&read_response([1, 2, 3, 0]));
        step(&mut driver, &mut iface, 10, &mut got);
        assert_eq!(got, vec![Reading::Particles2p5(2)]);
    }

    #[test]
    fn test_transport_error_is_returned() {
        let mut iface = MockInterface::new();
        let mut driver = Pm2005::new(0, Subscriptions::all(), SequencerTimings::default());
        iface.set_time(60_000);
        iface.fail_writes = true;
        let result = driver.service(&mut iface, &mut |_| {});
        assert_eq!(result, Err(SensorError::Io(MockCommError)));

        iface.fail_reads = true;
        assert_eq!(driver.service(&mut iface, &mut |_| {}), Err(SensorError::Io(MockCommError)));
    }
}
