//! Byte-stream decoder with running status
//!
//! Serial and USB links deliver MIDI as a byte stream. The decoder keeps the
//! last channel status, skips real-time and SysEx bytes, and reports stray or
//! truncated data so the caller can discard it and keep polling.

use super::{data_len, MidiMessage};
use crate::error::TransportError;

/// Incremental decoder for a raw MIDI byte stream
#[derive(Debug, Default)]
pub struct StreamDecoder {
    running_status: Option<u8>,
    data: [u8; 2],
    have: usize,
    in_sysex: bool,
    skip: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns a message when one completes
    pub fn push(&mut self, byte: u8) -> Result<Option<MidiMessage>, TransportError> {
        // Real-time bytes may appear anywhere, even mid-message
        if byte >= 0xF8 {
            return Ok(None);
        }

        if byte >= 0x80 {
            let truncated = self.have > 0;
            let previous = self.running_status;
            self.have = 0;
            self.skip = 0;
            self.in_sysex = false;

            match byte {
                0xF0 => {
                    self.in_sysex = true;
                    self.running_status = None;
                }
                0xF7 => {}
                0xF1 | 0xF3 => {
                    self.running_status = None;
                    self.skip = 1;
                }
                0xF2 => {
                    self.running_status = None;
                    self.skip = 2;
                }
                0xF4..=0xF6 => self.running_status = None,
                _ => self.running_status = Some(byte),
            }

            if truncated {
                return Err(TransportError::Malformed(format!(
                    "truncated message with status 0x{:02X}",
                    previous.unwrap_or(0)
                )));
            }
            return Ok(None);
        }

        if self.in_sysex {
            return Ok(None);
        }
        if self.skip > 0 {
            self.skip -= 1;
            return Ok(None);
        }

        let status = match self.running_status {
            Some(s) => s,
            None => {
                return Err(TransportError::Malformed(format!(
                    "stray data byte 0x{:02X}",
                    byte
                )))
            }
        };

        self.data[self.have] = byte;
        self.have += 1;

        let needed = data_len(status).unwrap_or(2);
        if self.have < needed {
            return Ok(None);
        }
        self.have = 0;

        Ok(MidiMessage::from_parts(status, self.data[0], self.data[1]))
    }

    /// Feed a buffer, collecting every decoded message and error in order
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<MidiMessage, TransportError>> {
        bytes
            .iter()
            .filter_map(|&b| self.push(b).transpose())
            .collect()
    }
}
