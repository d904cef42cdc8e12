// src/sensor/pm2005/sequencer.rs

use core::time::Duration;
use log::{debug, warn};

use super::protocol::{Command, ReadKind};
use crate::common::timing::{self, elapsed};

/// Durations that drive one measurement cycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SequencerTimings {
    /// Between the starts of consecutive cycles.
    pub measurement_interval: Duration,
    /// How long an open command may go unacknowledged.
    pub open_ack_timeout: Duration,
    /// From acknowledgement to the particle read.
    pub warmup: Duration,
    /// Between the particle read, the mass read and the end of the cycle.
    pub read_gap: Duration,
}

impl Default for SequencerTimings {
    fn default() -> Self {
        SequencerTimings {
            measurement_interval: timing::MEASUREMENT_INTERVAL,
            open_ack_timeout: timing::OPEN_ACK_TIMEOUT,
            warmup: timing::WARMUP_DURATION,
            read_gap: timing::READ_GAP,
        }
    }
}

/// Progress through the Measuring state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MeasuringPhase {
    /// Sensor acknowledged; waiting out the warm-up.
    Warmup,
    /// Particle read sent; the mass read follows after the read gap.
    ParticleRequested,
    /// Mass read sent; the cycle ends after the read gap.
    MassRequested,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SequencerState {
    Idle,
    AwaitingOpenAck,
    Measuring(MeasuringPhase),
}

/// Clock-driven open / warm-up / read / read cycle for the PM2005.
///
/// Every call to [`poll`](Self::poll) takes at most one action. All times are
/// samples of a wrapping millisecond counter.
#[derive(Debug, Clone)]
pub struct CommandSequencer {
    state: SequencerState,
    timings: SequencerTimings,
    /// When the current cycle began (open command sent).
    measurement_start_ms: u32,
    /// When the current state or phase was entered.
    phase_entry_ms: u32,
}

impl CommandSequencer {
    /// Starts Idle, with the first cycle one full interval after `now_ms`.
    pub fn new(now_ms: u32, timings: SequencerTimings) -> Self {
        CommandSequencer {
            state: SequencerState::Idle,
            timings,
            measurement_start_ms: now_ms,
            phase_entry_ms: now_ms,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn timings(&self) -> &SequencerTimings {
        &self.timings
    }

    /// The read a `0x0B` response currently answers.
    pub fn pending_read(&self) -> ReadKind {
        match self.state {
            SequencerState::Measuring(MeasuringPhase::MassRequested) => ReadKind::Mass,
            _ => ReadKind::Particles,
        }
    }

    /// Whether a read has been sent and its response not yet superseded.
    pub fn read_outstanding(&self) -> bool {
        matches!(
            self.state,
            SequencerState::Measuring(MeasuringPhase::ParticleRequested | MeasuringPhase::MassRequested)
        )
    }

    /// Evaluates timed transitions; returns the command to send, if any.
    pub fn poll(&mut self, now_ms: u32) -> Option<Command> {
        match self.state {
            SequencerState::Idle => {
                if elapsed(now_ms, self.measurement_start_ms) >= self.timings.measurement_interval {
                    debug!("pm2005: opening measurement");
                    self.measurement_start_ms = now_ms;
                    self.enter(SequencerState::AwaitingOpenAck, now_ms);
                    return Some(Command::OpenMeasurement);
                }
            }
            SequencerState::AwaitingOpenAck => {
                if elapsed(now_ms, self.phase_entry_ms) >= self.timings.open_ack_timeout {
                    warn!("pm2005: no acknowledgement to open command, returning to idle");
                    self.enter(SequencerState::Idle, now_ms);
                }
            }
            SequencerState::Measuring(phase) => {
                let in_phase = elapsed(now_ms, self.phase_entry_ms);
                match phase {
                    MeasuringPhase::Warmup if in_phase >= self.timings.warmup => {
                        debug!("pm2005: reading particle data");
                        self.enter(SequencerState::Measuring(MeasuringPhase::ParticleRequested), now_ms);
                        return Some(Command::ReadParticles);
                    }
                    MeasuringPhase::ParticleRequested if in_phase >= self.timings.read_gap => {
                        debug!("pm2005: reading mass data");
                        self.enter(SequencerState::Measuring(MeasuringPhase::MassRequested), now_ms);
                        return Some(Command::ReadMass);
                    }
                    MeasuringPhase::MassRequested if in_phase >= self.timings.read_gap => {
                        debug!("pm2005: measurement cycle complete");
                        self.enter(SequencerState::Idle, now_ms);
                    }
                    _ => {}
                }
            }
        }
        None
    }

    /// Feeds a successful open acknowledgement. Returns whether it was expected.
    pub fn on_open_ack(&mut self, now_ms: u32) -> bool {
        if self.state != SequencerState::AwaitingOpenAck {
            warn!("pm2005: unexpected open acknowledgement in {:?}, ignoring", self.state);
            return false;
        }
        debug!("pm2005: measurement opened");
        self.enter(SequencerState::Measuring(MeasuringPhase::Warmup), now_ms);
        true
    }

    fn enter(&mut self, state: SequencerState, now_ms: u32) {
        self.state = state;
        self.phase_entry_ms = now_ms;
    }
}
