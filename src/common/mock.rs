// src/common/mock.rs
//
// Scripted serial port and clock shared by the unit tests.

use std::collections::VecDeque;

use super::hal_traits::{SensorSerial, SensorTimer};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MockCommError;

/// A byte that becomes readable once the mock clock reaches `ready_at_ms`.
#[derive(Debug, Copy, Clone)]
struct Staged {
    ready_at_ms: u32,
    byte: u8,
}

#[derive(Debug, Default)]
pub struct MockInterface {
    pub current_time_ms: u32,
    read_queue: VecDeque<Staged>,
    write_log: Vec<u8>,
    pub flush_count: u32,
    pub delay_calls: u32,
    pub fail_reads: bool,
    pub fail_writes: bool,
    /// Staged when the written bytes end with `trigger`, `delay_ms` after the write.
    reply: Option<(Vec<u8>, u32, Vec<u8>)>,
}

impl MockInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(now_ms: u32) -> Self {
        MockInterface { current_time_ms: now_ms, ..Self::default() }
    }

    pub fn advance_time(&mut self, ms: u32) {
        self.current_time_ms = self.current_time_ms.wrapping_add(ms);
    }

    pub fn set_time(&mut self, now_ms: u32) {
        self.current_time_ms = now_ms;
    }

    /// Bytes readable immediately.
    pub fn stage_read_data(&mut self, data: &[u8]) {
        let now = self.current_time_ms;
        self.stage_read_data_at(now, data);
    }

    /// Bytes readable from `ready_at_ms` onwards.
    pub fn stage_read_data_at(&mut self, ready_at_ms: u32, data: &[u8]) {
        self.read_queue
            .extend(data.iter().map(|&byte| Staged { ready_at_ms, byte }));
    }

    /// Answers with `response` `delay_ms` after a write that ends with `trigger`.
    pub fn reply_to(&mut self, trigger: &[u8], delay_ms: u32, response: &[u8]) {
        self.reply = Some((trigger.to_vec(), delay_ms, response.to_vec()));
    }

    pub fn pending(&self) -> usize {
        self.read_queue.len()
    }

    pub fn written(&self) -> &[u8] {
        &self.write_log
    }

    pub fn clear_written(&mut self) {
        self.write_log.clear();
    }
}

impl SensorTimer for MockInterface {
    fn now_ms(&self) -> u32 {
        self.current_time_ms
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay_calls += 1;
        self.advance_time(ms);
    }
}

impl SensorSerial for MockInterface {
    type Error = MockCommError;

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        if self.fail_reads {
            return Err(nb::Error::Other(MockCommError));
        }
        match self.read_queue.front() {
            Some(staged)
                if self.current_time_ms.wrapping_sub(staged.ready_at_ms) < u32::MAX / 2 =>
            {
                let byte = staged.byte;
                self.read_queue.pop_front();
                Ok(byte)
            }
            _ => Err(nb::Error::WouldBlock),
        }
    }

    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        if self.fail_writes {
            return Err(nb::Error::Other(MockCommError));
        }
        self.write_log.push(byte);
        let triggered = match &self.reply {
            Some((trigger, delay_ms, response)) if self.write_log.ends_with(trigger) => {
                Some((self.current_time_ms.wrapping_add(*delay_ms), response.clone()))
            }
            _ => None,
        };
        if let Some((ready_at, response)) = triggered {
            self.stage_read_data_at(ready_at, &response);
        }
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.flush_count += 1;
        Ok(())
    }
}
