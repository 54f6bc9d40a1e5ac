//! Rotary encoder to CC conversion

use crate::config::EncoderConfig;
use crate::midi::MidiMessage;

/// Tracks the encoder's virtual 0-127 value and output slot
#[derive(Debug, Clone)]
pub struct EncoderState {
    config: EncoderConfig,
    last_position: i32,
    value: u8,
    /// Last slot sent in stepped mode; `None` until the first change
    slot: Option<u8>,
}

impl EncoderState {
    pub fn new(config: EncoderConfig) -> Self {
        let config = config.normalized();
        let value = config.initial;
        Self {
            config,
            last_position: 0,
            value,
            slot: None,
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn slot(&self) -> Option<u8> {
        self.slot
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Feed the absolute detent count; returns a CC when output changes
    pub fn update(&mut self, position: i32) -> Option<MidiMessage> {
        if position == self.last_position {
            return None;
        }
        let delta = position.saturating_sub(self.last_position);
        self.last_position = position;

        let next = (self.value as i32)
            .saturating_add(delta)
            .clamp(self.config.min as i32, self.config.max as i32) as u8;
        if next == self.value && self.config.steps.is_none() {
            return None;
        }
        self.value = next;

        let value = match self.config.steps {
            Some(steps) => {
                let slot_size = 128 / steps;
                let slot = (self.value / slot_size).min(steps - 1);
                if self.slot == Some(slot) {
                    return None;
                }
                self.slot = Some(slot);
                slot
            }
            None => self.value,
        };

        Some(MidiMessage::ControlChange {
            channel: self.config.channel.unwrap_or(0),
            cc: self.config.cc,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cc(value: u8) -> Option<MidiMessage> {
        Some(MidiMessage::ControlChange { channel: 0, cc: 11, value })
    }

    #[test]
    fn test_every_change_sent() {
        let mut enc = EncoderState::new(EncoderConfig::default());
        assert_eq!(enc.value(), 64);

        assert_eq!(enc.update(0), None);
        assert_eq!(enc.update(3), cc(67));
        assert_eq!(enc.update(1), cc(65));
    }

    #[test]
    fn test_clamped_to_range() {
        let cfg = EncoderConfig { min: 10, max: 20, initial: 15, ..Default::default() };
        let mut enc = EncoderState::new(cfg);

        assert_eq!(enc.update(100), cc(20));
        // Already at max: further clockwise turns are silent
        assert_eq!(enc.update(105), None);
        assert_eq!(enc.update(-200), cc(10));
    }

    #[test]
    fn test_stepped_mode_sends_slot_changes() {
        let cfg = EncoderConfig { steps: Some(4), initial: 0, ..Default::default() };
        let mut enc = EncoderState::new(cfg);

        // Slot size 32: first movement always reports the current slot
        assert_eq!(enc.update(1), cc(0));
        assert_eq!(enc.update(20), None);
        assert_eq!(enc.update(32), cc(1));
        assert_eq!(enc.update(200), cc(3));
        assert_eq!(enc.slot(), Some(3));
    }

    #[test]
    fn test_stepped_mode_last_slot_absorbs_remainder() {
        let cfg = EncoderConfig { steps: Some(5), initial: 127, ..Default::default() };
        let mut enc = EncoderState::new(cfg);

        // 128 / 5 = 25; 127 / 25 = 5, capped to slot 4
        assert_eq!(enc.update(1), cc(4));
    }
}
