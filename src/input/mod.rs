//! Continuous inputs: rotary encoder, encoder push and expression pedals

pub mod encoder;
pub mod expression;

pub use encoder::EncoderState;
pub use expression::ExpressionPedal;

use tracing::debug;

use crate::config::ResolvedConfig;
use crate::drivers::{AnalogInputs, EdgeKind};
use crate::midi::MidiMessage;
use crate::state::ButtonRuntimeState;

/// Runtime state of every analog control on the device
#[derive(Debug, Clone, Default)]
pub struct AnalogBank {
    pub encoder: Option<EncoderState>,
    pub encoder_push: Option<ButtonRuntimeState>,
    pub pedals: Vec<ExpressionPedal>,
}

impl AnalogBank {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            encoder: config.encoder.clone().map(EncoderState::new),
            encoder_push: config.encoder_push.clone().map(ButtonRuntimeState::new),
            pedals: config
                .expression
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, cfg)| ExpressionPedal::new(i, cfg))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_none() && self.encoder_push.is_none() && self.pedals.is_empty()
    }

    /// Sample every input once and queue the resulting messages
    pub fn poll(&mut self, inputs: &mut dyn AnalogInputs, outbox: &mut Vec<MidiMessage>) {
        if let Some(encoder) = self.encoder.as_mut() {
            if let Some(msg) = inputs.encoder_position().and_then(|pos| encoder.update(pos)) {
                debug!("Encoder -> {}", msg);
                outbox.push(msg);
            }
        }

        if let Some(push) = self.encoder_push.as_mut() {
            let msg = match inputs.poll_encoder_push() {
                Some(EdgeKind::Press) => Some(push.on_press()),
                Some(EdgeKind::Release) => push.on_release(),
                None => None,
            };
            if let Some(msg) = msg {
                debug!("Encoder push -> {}", msg);
                outbox.push(msg);
            }
        }

        for pedal in &mut self.pedals {
            if let Some(msg) = inputs.expression(pedal.index()).and_then(|raw| pedal.update(raw)) {
                debug!("{} -> {}", pedal.label(), msg);
                outbox.push(msg);
            }
        }
    }

    pub fn tick(&mut self) {
        if let Some(push) = self.encoder_push.as_mut() {
            push.tick();
        }
    }
}
