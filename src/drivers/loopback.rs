//! In-memory collaborators
//!
//! Each type is a cheap cloneable handle: the engine owns one clone and a
//! test (or the console runner) keeps another to script input and inspect
//! output.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

use super::{AnalogInputs, Edge, EdgeKind, LedDriver, MidiTransport, SwitchScanner};
use crate::color::Rgb;
use crate::error::TransportError;
use crate::midi::{MidiMessage, StreamDecoder};

#[derive(Default)]
struct MidiQueues {
    inbound: VecDeque<Result<MidiMessage, TransportError>>,
    sent: Vec<MidiMessage>,
    fail_sends: bool,
}

/// MIDI transport backed by two queues
#[derive(Clone, Default)]
pub struct LoopbackMidi {
    inner: Arc<Mutex<MidiQueues>>,
}

impl LoopbackMidi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message as if the host had sent it
    pub fn inject(&self, msg: MidiMessage) {
        self.inner.lock().inbound.push_back(Ok(msg));
    }

    /// Queue raw host bytes, decoded the way a serial link would be
    pub fn inject_bytes(&self, bytes: &[u8]) {
        let mut decoder = StreamDecoder::new();
        let decoded = decoder.feed(bytes);
        self.inner.lock().inbound.extend(decoded);
    }

    pub fn inject_error(&self, err: TransportError) {
        self.inner.lock().inbound.push_back(Err(err));
    }

    /// Drain everything the engine has sent so far
    pub fn take_sent(&self) -> Vec<MidiMessage> {
        std::mem::take(&mut self.inner.lock().sent)
    }

    pub fn pending_inbound(&self) -> usize {
        self.inner.lock().inbound.len()
    }

    /// Make every following `send` fail until cleared
    pub fn set_send_failure(&self, fail: bool) {
        self.inner.lock().fail_sends = fail;
    }
}

impl MidiTransport for LoopbackMidi {
    fn receive(&mut self) -> Result<Option<MidiMessage>, TransportError> {
        self.inner.lock().inbound.pop_front().transpose()
    }

    fn send(&mut self, msg: &MidiMessage) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.fail_sends {
            return Err(TransportError::Send("loopback send disabled".into()));
        }
        inner.sent.push(*msg);
        Ok(())
    }
}

/// Switch scanner fed from a script
#[derive(Clone, Default)]
pub struct ScriptedSwitches {
    edges: Arc<Mutex<VecDeque<Edge>>>,
}

impl ScriptedSwitches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, edge: Edge) {
        self.edges.lock().push_back(edge);
    }

    pub fn press(&self, button_index: usize) {
        self.push(Edge::press(button_index));
    }

    pub fn release(&self, button_index: usize) {
        self.push(Edge::release(button_index));
    }

    /// Press immediately followed by release
    pub fn tap(&self, button_index: usize) {
        let mut edges = self.edges.lock();
        edges.push_back(Edge::press(button_index));
        edges.push_back(Edge::release(button_index));
    }

    pub fn pending(&self) -> usize {
        self.edges.lock().len()
    }
}

impl SwitchScanner for ScriptedSwitches {
    fn poll_edge(&mut self) -> Option<Edge> {
        self.edges.lock().pop_front()
    }
}

#[derive(Default)]
struct AnalogScript {
    encoder: Option<i32>,
    push: VecDeque<EdgeKind>,
    pedals: [Option<u16>; 2],
}

/// Analog inputs whose values are set by hand
#[derive(Clone, Default)]
pub struct ScriptedAnalog {
    inner: Arc<Mutex<AnalogScript>>,
}

impl ScriptedAnalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute encoder position
    pub fn set_encoder(&self, position: i32) {
        self.inner.lock().encoder = Some(position);
    }

    /// Move the encoder by `delta` detents
    pub fn turn_encoder(&self, delta: i32) {
        let mut inner = self.inner.lock();
        let pos = inner.encoder.unwrap_or(0).saturating_add(delta);
        inner.encoder = Some(pos);
    }

    pub fn push_encoder(&self, kind: EdgeKind) {
        self.inner.lock().push.push_back(kind);
    }

    pub fn set_expression(&self, pedal: usize, raw: u16) {
        if let Some(slot) = self.inner.lock().pedals.get_mut(pedal) {
            *slot = Some(raw);
        }
    }
}

impl AnalogInputs for ScriptedAnalog {
    fn encoder_position(&mut self) -> Option<i32> {
        self.inner.lock().encoder
    }

    fn poll_encoder_push(&mut self) -> Option<EdgeKind> {
        self.inner.lock().push.pop_front()
    }

    fn expression(&mut self, pedal: usize) -> Option<u16> {
        self.inner.lock().pedals.get(pedal).copied().flatten()
    }
}

struct Frame {
    pending: Vec<Rgb>,
    shown: Vec<Rgb>,
    flushes: u64,
}

/// NeoPixel strip model: each button owns a run of pixels
///
/// `set` writes into a pending buffer; `flush` publishes it.
#[derive(Clone)]
pub struct PixelStrip {
    pixels_per_button: usize,
    frame: Arc<Mutex<Frame>>,
}

impl PixelStrip {
    pub fn new(button_count: usize, pixels_per_button: usize) -> Self {
        let len = button_count * pixels_per_button;
        Self {
            pixels_per_button,
            frame: Arc::new(Mutex::new(Frame {
                pending: vec![Rgb::BLACK; len],
                shown: vec![Rgb::BLACK; len],
                flushes: 0,
            })),
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.frame.lock().shown.len()
    }

    /// Last flushed frame
    pub fn shown(&self) -> Vec<Rgb> {
        self.frame.lock().shown.clone()
    }

    /// Color of a button's first pixel in the last flushed frame
    pub fn button_color(&self, button_index: usize) -> Option<Rgb> {
        self.frame
            .lock()
            .shown
            .get(button_index * self.pixels_per_button)
            .copied()
    }

    pub fn flush_count(&self) -> u64 {
        self.frame.lock().flushes
    }
}

impl LedDriver for PixelStrip {
    fn set(&mut self, button_index: usize, color: Rgb) {
        let start = button_index * self.pixels_per_button;
        let mut frame = self.frame.lock();
        match frame.pending.get_mut(start..start + self.pixels_per_button) {
            Some(run) => run.fill(color),
            None => trace!("LED index {} outside strip, ignoring", button_index),
        }
    }

    fn flush(&mut self) {
        let mut frame = self.frame.lock();
        let Frame { pending, shown, flushes } = &mut *frame;
        shown.copy_from_slice(pending);
        *flushes += 1;
    }
}
