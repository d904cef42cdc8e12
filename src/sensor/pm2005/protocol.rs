// src/sensor/pm2005/protocol.rs

use arrayvec::ArrayVec;
use core::fmt::Debug;
use log::trace;

use crate::common::{
    accumulator::ByteAccumulator,
    checksum::{additive_checksum, verify_additive},
    error::SensorError,
    frame::ValidatedFrame,
    reading::{Reading, Readings},
};

/// First byte of every host-to-sensor frame.
pub const TX_HEADER: u8 = 0x11;
/// First byte of every sensor-to-host frame.
pub const RX_HEADER: u8 = 0x16;
/// Hard bound on a receive candidate; anything longer is discarded.
pub const MAX_FRAME_LEN: usize = 50;
/// Header, length and checksum bytes around the command byte and payload.
const FRAME_OVERHEAD: usize = 3;

pub const CMD_OPEN_CLOSE: u8 = 0x0C;
pub const CMD_READ: u8 = 0x0B;

/// Status byte of a successful open acknowledgement.
pub const OPEN_ACK_OK: u8 = 0x02;
/// Minimum declared length of a data read response.
pub const READ_RESPONSE_MIN_LEN: u8 = 17;

const OPEN_PAYLOAD: &[u8] = &[OPEN_ACK_OK, 0x1E];
const READ_PARTICLES_PAYLOAD: &[u8] = &[];
const READ_MASS_PAYLOAD: &[u8] = &[0x01];

const MAX_PAYLOAD: usize = 4;
pub const MAX_COMMAND_LEN: usize = FRAME_OVERHEAD + 1 + MAX_PAYLOAD;

/// Builds `[0x11][len][cmd][payload..][checksum]`, where `len` counts the
/// command byte and payload.
pub fn encode_frame<E: Debug>(
    cmd: u8,
    payload: &[u8],
) -> Result<ArrayVec<u8, MAX_COMMAND_LEN>, SensorError<E>> {
    let overflow = || SensorError::<E>::BufferOverflow { limit: MAX_COMMAND_LEN };
    if payload.len() > MAX_PAYLOAD {
        return Err(overflow());
    }
    let mut frame = ArrayVec::<u8, MAX_COMMAND_LEN>::new();
    frame.try_push(TX_HEADER).map_err(|_| overflow())?;
    // Bounded by MAX_PAYLOAD above
    frame.try_push(payload.len() as u8 + 1).map_err(|_| overflow())?;
    frame.try_push(cmd).map_err(|_| overflow())?;
    frame.try_extend_from_slice(payload).map_err(|_| overflow())?;
    let checksum = additive_checksum(&frame);
    frame.try_push(checksum).map_err(|_| overflow())?;
    Ok(frame)
}

/// Commands the measurement cycle sends.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Command {
    /// `11 03 0C 02 1E C0`
    OpenMeasurement,
    /// `11 01 0B E3`
    ReadParticles,
    /// `11 02 0B 01 E1`
    ReadMass,
}

impl Command {
    fn parts(&self) -> (u8, &'static [u8]) {
        match self {
            Command::OpenMeasurement => (CMD_OPEN_CLOSE, OPEN_PAYLOAD),
            Command::ReadParticles => (CMD_READ, READ_PARTICLES_PAYLOAD),
            Command::ReadMass => (CMD_READ, READ_MASS_PAYLOAD),
        }
    }

    pub fn encode<E: Debug>(&self) -> Result<ArrayVec<u8, MAX_COMMAND_LEN>, SensorError<E>> {
        let (cmd, payload) = self.parts();
        encode_frame(cmd, payload)
    }
}

/// Which data read a `0x0B` response answers. Both reads share the command
/// byte, so the caller supplies the read it issued last.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ReadKind {
    #[default]
    Particles,
    Mass,
}

/// A validated, interpreted inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Answer to open/close; `status == OPEN_ACK_OK` means measuring started.
    OpenAck { status: u8 },
    /// Particle counts per litre.
    Particles { pm0_5: u32, pm2_5: u32, pm10: u32 },
    /// Mass concentrations, µg/m³.
    Mass { pm2_5: u32, pm10: u32 },
    /// Well formed, but nothing this driver acts on.
    Ignored { command: Option<u8>, declared_len: u8 },
}

impl Response {
    pub fn readings(&self) -> Readings {
        let mut readings = Readings::new();
        match *self {
            Response::Particles { pm0_5, pm2_5, pm10 } => readings.extend([
                Reading::Particles0p5(pm0_5),
                Reading::Particles2p5(pm2_5),
                Reading::Particles10(pm10),
            ]),
            Response::Mass { pm2_5, pm10 } => {
                readings.extend([Reading::Pm2p5Mass(pm2_5), Reading::Pm10Mass(pm10)])
            }
            Response::OpenAck { .. } | Response::Ignored { .. } => {}
        }
        readings
    }
}

/// Interprets a validated frame. `read` selects the layout of a `0x0B` response.
pub fn decode(frame: &ValidatedFrame<MAX_FRAME_LEN>, read: ReadKind) -> Response {
    let bytes = frame.as_bytes();
    let declared_len = bytes[1];
    if declared_len == 0 {
        return Response::Ignored { command: None, declared_len };
    }

    match bytes[2] {
        CMD_OPEN_CLOSE if declared_len >= 2 => Response::OpenAck { status: bytes[3] },
        CMD_READ if declared_len >= READ_RESPONSE_MIN_LEN => match read {
            ReadKind::Particles => Response::Particles {
                pm0_5: frame.be_u32(3),
                pm2_5: frame.be_u32(7),
                pm10: frame.be_u32(11),
            },
            ReadKind::Mass => Response::Mass { pm2_5: frame.be_u32(3), pm10: frame.be_u32(7) },
        },
        command => Response::Ignored { command: Some(command), declared_len },
    }
}

/// Length-prefixed synchronizer with one-byte sliding resync.
///
/// A header whose declared length could never fit in [`MAX_FRAME_LEN`] is
/// treated as noise and dropped at once, so the candidate never outgrows the
/// bound.
#[derive(Debug, Default)]
pub struct Pm2005Framer {
    candidate: ByteAccumulator<MAX_FRAME_LEN>,
    hunting: bool,
}

impl Pm2005Framer {
    pub const fn new() -> Self {
        Pm2005Framer { candidate: ByteAccumulator::new(), hunting: false }
    }

    /// Feeds one byte; yields a frame once `declared_len + 3` bytes are buffered.
    ///
    /// The first byte discarded while hunting for a header is reported as
    /// `UnexpectedHeader`; the rest of that run is skipped quietly.
    pub fn push(&mut self, byte: u8) -> nb::Result<ValidatedFrame<MAX_FRAME_LEN>, SensorError> {
        self.candidate.push(byte).map_err(nb::Error::Other)?;

        let mut stray = None;
        loop {
            while let Some(first) = self.candidate.first() {
                if first == RX_HEADER {
                    break;
                }
                trace!("pm2005: dropping {:#04x} to resync", first);
                stray.get_or_insert(first);
                self.candidate.drop_front(1);
            }
            match self.candidate.get(1) {
                Some(declared_len) if usize::from(declared_len) + FRAME_OVERHEAD > MAX_FRAME_LEN => {
                    trace!("pm2005: declared length {} cannot fit, dropping header", declared_len);
                    self.candidate.drop_front(1);
                }
                _ => break,
            }
        }

        // Bytes are only discarded before a candidate holds a usable length,
        // so the candidate is empty whenever something was discarded.
        if let Some(first) = stray {
            let new_run = !core::mem::replace(&mut self.hunting, true);
            return Err(if new_run {
                nb::Error::Other(SensorError::UnexpectedHeader(first))
            } else {
                nb::Error::WouldBlock
            });
        }
        self.hunting = false;

        let Some(declared_len) = self.candidate.get(1) else {
            return Err(nb::Error::WouldBlock);
        };
        let total = usize::from(declared_len) + FRAME_OVERHEAD;
        if self.candidate.len() < total {
            return Err(nb::Error::WouldBlock);
        }

        let bytes = self.candidate.take();
        verify_additive::<()>(&bytes).map_err(nb::Error::Other)?;
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

/// Builds a valid response frame around `body` (command byte and payload).
#[cfg(test)]
pub(crate) fn encode_response(body: &[u8]) -> Vec<u8> {
    let mut frame = vec![RX_HEADER, body.len() as u8];
    frame.extend_from_slice(body);
    frame.push(additive_checksum(&frame));
    frame
}

/// A 0x0B response carrying the given sixteen data bytes as four BE words.
#[cfg(test)]
pub(crate) fn read_response(words: [u32; 4]) -> Vec<u8> {
    let mut body = vec![CMD_READ];
    for w in words {
        body.extend_from_slice(&w.to_be_bytes());
    }
    encode_response(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(framer: &mut Pm2005Framer, bytes: &[u8]) -> Vec<Result<Vec<u8>, SensorError>> {
        bytes
            .iter()
            .filter_map(|b| match framer.push(*b) {
                Ok(frame) => Some(Ok(frame.as_bytes().to_vec())),
                Err(nb::Error::WouldBlock) => None,
                Err(nb::Error::Other(e)) => Some(Err(e)),
            })
            .collect()
    }

    #[test]
    fn test_command_encoding() {
        assert_eq!(
            Command::OpenMeasurement.encode::<()>().unwrap().as_slice(),
            &[0x11, 0x03, 0x0C, 0x02, 0x1E, 0xC0]
        );
        assert_eq!(Command::ReadParticles.encode::<()>().unwrap().as_slice(), &[0x11, 0x01, 0x0B, 0xE3]);
        assert_eq!(Command::ReadMass.encode::<()>().unwrap().as_slice(), &[0x11, 0x02, 0x0B, 0x01, 0xE1]);
    }

    #[test]
    fn test_encode_frame_rejects_oversized_payload() {
        let result = encode_frame::<()>(0x0B, &[0u8; MAX_PAYLOAD + 1]);
        assert_eq!(result, Err(SensorError::BufferOverflow { limit: MAX_COMMAND_LEN }));
        // Length byte would not fit in a u8
        let result = encode_frame::<()>(0x0B, &[0u8; 255]);
        assert_eq!(result, Err(SensorError::BufferOverflow { limit: MAX_COMMAND_LEN }));
    }

    #[test]
    fn test_frame_length_matches_declared_length() {
        let mut framer = Pm2005Framer::new();
        let frame = read_response([1, 2, 3, 4]);
        assert_eq!(frame.len(), usize::from(frame[1]) + 3);
        let results = feed(&mut framer, &frame);
        assert_eq!(results, vec![Ok(frame)]);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut framer = Pm2005Framer::new();
        let ack = encode_response(&[CMD_OPEN_CLOSE, OPEN_ACK_OK]);
        let mut stream = vec![0x00, 0x11, 0xFF, 0x0C];
        stream.extend_from_slice(&ack);
        assert_eq!(
            feed(&mut framer, &stream),
            vec![Err(SensorError::UnexpectedHeader(0x00)), Ok(ack)]
        );
    }

    #[test]
    fn test_each_garbage_run_reported_once() {
        let mut framer = Pm2005Framer::new();
        let ack = encode_response(&[CMD_OPEN_CLOSE, OPEN_ACK_OK]);
        let mut stream = vec![0x01, 0x02];
        stream.extend_from_slice(&ack);
        stream.extend_from_slice(&[0x03, 0x04, 0x05]);
        stream.extend_from_slice(&ack);
        assert_eq!(
            feed(&mut framer, &stream),
            vec![
                Err(SensorError::UnexpectedHeader(0x01)),
                Ok(ack.clone()),
                Err(SensorError::UnexpectedHeader(0x03)),
                Ok(ack),
            ]
        );
    }

    #[test]
    fn test_consecutive_frames() {
        let mut framer = Pm2005Framer::new();
        let a = encode_response(&[CMD_OPEN_CLOSE, OPEN_ACK_OK]);
        let b = read_response([10, 20, 30, 0]);
        let stream: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
        assert_eq!(feed(&mut framer, &stream), vec![Ok(a), Ok(b)]);
    }

    #[test]
    fn test_checksum_failure_consumes_frame() {
        let mut framer = Pm2005Framer::new();
        let mut frame = encode_response(&[CMD_OPEN_CLOSE, OPEN_ACK_OK]);
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        let results = feed(&mut framer, &frame);
        assert!(matches!(results.as_slice(), [Err(SensorError::ChecksumMismatch { .. })]));
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_impossible_declared_length_resyncs_immediately() {
        let mut framer = Pm2005Framer::new();
        let ack = encode_response(&[CMD_OPEN_CLOSE, OPEN_ACK_OK]);
        let mut stream = vec![RX_HEADER, 0xFF];
        stream.extend_from_slice(&ack);
        assert_eq!(
            feed(&mut framer, &stream),
            vec![Err(SensorError::UnexpectedHeader(0xFF)), Ok(ack)]
        );
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_largest_declared_length_fits() {
        let mut framer = Pm2005Framer::new();
        let mut body = vec![0x33];
        body.resize(MAX_FRAME_LEN - 3, 0xAA);
        let frame = encode_response(&body);
        assert_eq!(frame.len(), MAX_FRAME_LEN);
        assert_eq!(feed(&mut framer, &frame), vec![Ok(frame)]);

        // One more and the header is noise
        body.push(0xAA);
        let frame = encode_response(&body);
        let results = feed(&mut framer, &frame);
        assert_eq!(results[0], Err(SensorError::UnexpectedHeader(48)));
        assert!(results.iter().all(|r| r.is_err()));
    }

    #[test]
    fn test_reset_then_refeed_is_idempotent() {
        let frame = read_response([40, 50, 60, 0]);
        let mut fresh = Pm2005Framer::new();
        let expected = feed(&mut fresh, &frame);

        let mut framer = Pm2005Framer::new();
        assert!(feed(&mut framer, &frame[..9]).is_empty());
        framer.reset();
        assert_eq!(framer.buffered(), 0);
        assert_eq!(feed(&mut framer, &frame), expected);
    }

    fn decode_bytes(bytes: &[u8], read: ReadKind) -> Response {
        let mut framer = Pm2005Framer::new();
        let frame = bytes
            .iter()
            .find_map(|b| framer.push(*b).ok())
            .expect("frame should validate");
        decode(&frame, read)
    }

    #[test]
    fn test_decode_open_ack() {
        let ok = encode_response(&[CMD_OPEN_CLOSE, OPEN_ACK_OK]);
        assert_eq!(decode_bytes(&ok, ReadKind::Particles), Response::OpenAck { status: 0x02 });
        let rejected = encode_response(&[CMD_OPEN_CLOSE, 0x01]);
        assert_eq!(decode_bytes(&rejected, ReadKind::Particles), Response::OpenAck { status: 0x01 });
    }

    #[test]
    fn test_decode_particle_and_mass() {
        let frame = read_response([1200, 300, 15, 0]);
        assert_eq!(
            decode_bytes(&frame, ReadKind::Particles),
            Response::Particles { pm0_5: 1200, pm2_5: 300, pm10: 15 }
        );
        assert_eq!(decode_bytes(&frame, ReadKind::Mass), Response::Mass { pm2_5: 1200, pm10: 300 });
        assert_eq!(
            Response::Mass { pm2_5: 12, pm10: 30 }.readings().as_slice(),
            &[Reading::Pm2p5Mass(12), Reading::Pm10Mass(30)]
        );
    }

    #[test]
    fn test_decode_big_endian_words() {
        let frame = read_response([0x0102_0304, 0xFFFF_FFFF, 0, 0]);
        assert_eq!(
            decode_bytes(&frame, ReadKind::Particles),
            Response::Particles { pm0_5: 0x0102_0304, pm2_5: u32::MAX, pm10: 0 }
        );
    }

    #[test]
    fn test_decode_ignored_frames() {
        // Zero declared length
        let empty = encode_response(&[]);
        assert_eq!(empty.len(), 3);
        assert_eq!(
            decode_bytes(&empty, ReadKind::Particles),
            Response::Ignored { command: None, declared_len: 0 }
        );
        // Read response shorter than 17
        let short = encode_response(&[CMD_READ, 0, 0, 0, 1]);
        assert_eq!(
            decode_bytes(&short, ReadKind::Particles),
            Response::Ignored { command: Some(CMD_READ), declared_len: 5 }
        );
        // Unknown command byte
        let unknown = encode_response(&[0x33, 0x01]);
        assert!(decode_bytes(&unknown, ReadKind::Mass).readings().is_empty());
    }
}
