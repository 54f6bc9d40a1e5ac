//! Hardware collaborators consumed by the dispatch engine
//!
//! The engine polls every collaborator once per tick and never blocks.
//! Implementations that sit on another thread (midir callbacks, the
//! interactive console) hand data over through lock-free queues.

use crate::color::Rgb;
use crate::error::TransportError;
use crate::midi::MidiMessage;

pub mod console;
pub mod loopback;
pub mod midi_port;

pub use console::ConsoleSwitches;
pub use loopback::{LoopbackMidi, PixelStrip, ScriptedAnalog, ScriptedSwitches};
pub use midi_port::MidiPortTransport;

/// Debounced switch transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Press,
    Release,
}

/// One switch transition, addressed by 0-based button index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub button_index: usize,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn press(button_index: usize) -> Self {
        Self { button_index, kind: EdgeKind::Press }
    }

    pub fn release(button_index: usize) -> Self {
        Self { button_index, kind: EdgeKind::Release }
    }
}

/// Source of footswitch edges; debouncing is the scanner's job
pub trait SwitchScanner: Send {
    /// Next pending edge, or `None` when nothing is queued
    fn poll_edge(&mut self) -> Option<Edge>;
}

/// Bidirectional MIDI link to the host
pub trait MidiTransport: Send {
    /// Next decoded inbound message without blocking
    ///
    /// `Ok(None)` means the queue is empty. An `Err` covers one discarded
    /// message; callers may keep polling.
    fn receive(&mut self) -> Result<Option<MidiMessage>, TransportError>;

    fn send(&mut self, msg: &MidiMessage) -> Result<(), TransportError>;
}

/// Per-button LED output, batched until `flush`
pub trait LedDriver: Send {
    fn set(&mut self, button_index: usize, color: Rgb);

    fn flush(&mut self);
}

/// Encoder and expression pedal sampling (STD10 only)
pub trait AnalogInputs: Send {
    /// Absolute encoder detent count, if an encoder is fitted
    fn encoder_position(&mut self) -> Option<i32>;

    /// Pending edge of the encoder push switch
    fn poll_encoder_push(&mut self) -> Option<EdgeKind>;

    /// Raw 16-bit sample of pedal `pedal` (0 or 1)
    fn expression(&mut self, pedal: usize) -> Option<u16>;
}
