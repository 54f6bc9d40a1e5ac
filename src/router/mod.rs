//! Router module - the per-iteration dispatch engine
//!
//! `DispatchEngine::tick` runs one deterministic loop iteration:
//! - drain inbound MIDI through the host sync handler
//! - drain switch edges into the button state machines
//! - sample the encoder, encoder push and expression pedals
//! - advance button timers
//! - push every LED color and flush the strip
//! - send everything queued for the host
//!
//! Host messages are applied before local edges, so a press in the same
//! tick as a host update wins.

mod host_sync;

pub use host_sync::HostSyncHandler;

#[cfg(test)]
mod tests;

use std::slice;
use tracing::{debug, info, trace, warn};

use crate::color::Rgb;
use crate::config::{DeviceKind, ResolvedConfig};
use crate::drivers::{AnalogInputs, Edge, EdgeKind, LedDriver, MidiTransport, SwitchScanner};
use crate::error::DispatchError;
use crate::input::AnalogBank;
use crate::midi::MidiMessage;
use crate::state::ButtonRuntimeState;

/// Upper bound on inbound messages and edges drained per tick
pub const MAX_EVENTS_PER_TICK: usize = 64;

/// Owns all runtime state and drives the collaborators
pub struct DispatchEngine {
    device: DeviceKind,
    buttons: Vec<ButtonRuntimeState>,
    analog: AnalogBank,
    switches: Box<dyn SwitchScanner>,
    transport: Box<dyn MidiTransport>,
    leds: Box<dyn LedDriver>,
    analog_inputs: Option<Box<dyn AnalogInputs>>,
    /// Messages produced this tick, sent in step (e)
    outbox: Vec<MidiMessage>,
    ticks: u64,
}

impl DispatchEngine {
    pub fn new(
        config: ResolvedConfig,
        switches: Box<dyn SwitchScanner>,
        transport: Box<dyn MidiTransport>,
        leds: Box<dyn LedDriver>,
    ) -> Self {
        let mut engine = Self {
            device: config.device,
            buttons: Vec::new(),
            analog: AnalogBank::default(),
            switches,
            transport,
            leds,
            analog_inputs: None,
            outbox: Vec::with_capacity(MAX_EVENTS_PER_TICK),
            ticks: 0,
        };
        engine.rebuild(config);
        engine
    }

    /// Attach encoder and pedal sampling
    pub fn with_analog(mut self, inputs: Box<dyn AnalogInputs>) -> Self {
        self.analog_inputs = Some(inputs);
        self
    }

    /// Discard all runtime state and rebuild it from a new config
    ///
    /// LEDs of buttons the new device no longer has are switched off.
    pub fn reload(&mut self, config: ResolvedConfig) {
        let previous = self.buttons.len();
        self.rebuild(config);

        if previous > self.buttons.len() {
            for i in self.buttons.len()..previous {
                self.leds.set(i, Rgb::BLACK);
            }
            self.leds.flush();
        }
        info!(
            "Reloaded config: {} ({} buttons)",
            self.device.as_str(),
            self.buttons.len()
        );
    }

    fn rebuild(&mut self, config: ResolvedConfig) {
        self.device = config.device;
        self.analog = AnalogBank::from_config(&config);
        self.buttons = config.buttons.into_iter().map(ButtonRuntimeState::new).collect();
        self.outbox.clear();
    }

    pub fn device(&self) -> DeviceKind {
        self.device
    }

    pub fn buttons(&self) -> &[ButtonRuntimeState] {
        &self.buttons
    }

    pub fn button(&self, index: usize) -> Option<&ButtonRuntimeState> {
        self.buttons.get(index)
    }

    pub fn analog(&self) -> &AnalogBank {
        &self.analog
    }

    /// Completed iterations since start
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one loop iteration
    pub fn tick(&mut self) {
        self.drain_inbound();
        self.drain_edges();

        if let Some(inputs) = self.analog_inputs.as_mut() {
            self.analog.poll(inputs.as_mut(), &mut self.outbox);
        }

        for button in &mut self.buttons {
            button.tick();
        }
        self.analog.tick();

        for (i, button) in self.buttons.iter().enumerate() {
            self.leds.set(i, button.led_color());
        }
        self.leds.flush();

        self.send_outbox();
        self.ticks = self.ticks.wrapping_add(1);
    }

    fn drain_inbound(&mut self) {
        for _ in 0..MAX_EVENTS_PER_TICK {
            match self.transport.receive() {
                Ok(Some(msg)) => {
                    debug!("RX {}", msg);
                    if let Err(e) = self.apply_host(&msg) {
                        debug!("Dropping inbound message: {}", e);
                    }
                }
                Ok(None) => return,
                Err(e) => warn!("Discarding inbound MIDI: {}", e),
            }
        }
        trace!("Inbound drain hit the per-tick limit, continuing next tick");
    }

    fn apply_host(&mut self, msg: &MidiMessage) -> Result<usize, DispatchError> {
        let mut updated = HostSyncHandler::apply(&mut self.buttons, msg)?;
        if let Some(push) = self.analog.encoder_push.as_mut() {
            updated += HostSyncHandler::apply(slice::from_mut(push), msg)?;
        }
        Ok(updated)
    }

    fn drain_edges(&mut self) {
        for _ in 0..MAX_EVENTS_PER_TICK {
            let Some(edge) = self.switches.poll_edge() else {
                return;
            };
            if let Err(e) = self.handle_edge(edge) {
                warn!("Dropping switch edge: {}", e);
            }
        }
        trace!("Edge drain hit the per-tick limit, continuing next tick");
    }

    fn handle_edge(&mut self, edge: Edge) -> Result<(), DispatchError> {
        let count = self.buttons.len();
        let button = self
            .buttons
            .get_mut(edge.button_index)
            .ok_or(DispatchError::UnknownButton { index: edge.button_index, count })?;

        let msg = match edge.kind {
            EdgeKind::Press => Some(button.on_press()),
            EdgeKind::Release => button.on_release(),
        };
        if let Some(msg) = msg {
            debug!(
                "Switch {} {:?} ('{}') -> {}",
                edge.button_index + 1,
                edge.kind,
                button.label(),
                msg
            );
            self.outbox.push(msg);
        }
        Ok(())
    }

    fn send_outbox(&mut self) {
        for msg in self.outbox.drain(..) {
            match self.transport.send(&msg) {
                Ok(()) => debug!("TX {}", msg),
                Err(e) => warn!("Failed to send {}: {}", msg, e),
            }
        }
    }
}
