//! Expression pedal to CC conversion with auto-calibration

use crate::config::{ExpressionConfig, Polarity};
use crate::midi::MidiMessage;

/// Raw ADC bounds assumed before any sample widens them
pub const INITIAL_RAW_MIN: u16 = 2048;
pub const INITIAL_RAW_MAX: u16 = 63488;

#[derive(Debug, Clone)]
pub struct ExpressionPedal {
    index: usize,
    config: ExpressionConfig,
    raw_min: u16,
    raw_max: u16,
    last: u8,
}

impl ExpressionPedal {
    pub fn new(index: usize, config: ExpressionConfig) -> Self {
        Self {
            index,
            config,
            raw_min: INITIAL_RAW_MIN,
            raw_max: INITIAL_RAW_MAX,
            last: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Last value sent
    pub fn value(&self) -> u8 {
        self.last
    }

    /// Calibrated raw range seen so far
    pub fn calibration(&self) -> (u16, u16) {
        (self.raw_min, self.raw_max)
    }

    /// Feed one raw sample; returns a CC when the output moved by at least
    /// the configured threshold
    pub fn update(&mut self, raw: u16) -> Option<MidiMessage> {
        self.raw_min = self.raw_min.min(raw);
        self.raw_max = self.raw_max.max(raw);
        if self.raw_max <= self.raw_min {
            return None;
        }

        let span = (self.raw_max - self.raw_min) as f32;
        let mut normalized = (raw - self.raw_min) as f32 / span;
        if self.config.polarity == Polarity::Reverse {
            normalized = 1.0 - normalized;
        }

        let (out_min, out_max) = (self.config.min as f32, self.config.max as f32);
        let value = (out_min + normalized * (out_max - out_min)) as i32;
        let value = value.clamp(0, 127) as u8;

        if value.abs_diff(self.last) < self.config.threshold {
            return None;
        }
        self.last = value;

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

    fn pedal(config: ExpressionConfig) -> ExpressionPedal {
        ExpressionPedal::new(0, config)
    }

    fn cc(value: u8) -> Option<MidiMessage> {
        Some(MidiMessage::ControlChange { channel: 0, cc: 12, value })
    }

    #[test]
    fn test_full_travel() {
        let mut exp = pedal(ExpressionConfig::default_for(0));

        // Heel down maps to 0, same as the starting value
        assert_eq!(exp.update(INITIAL_RAW_MIN), None);
        assert_eq!(exp.update(INITIAL_RAW_MAX), cc(127));
        assert_eq!(exp.update(33000), cc(63));
    }

    #[test]
    fn test_threshold_suppresses_jitter() {
        let mut exp = pedal(ExpressionConfig::default_for(0));
        exp.update(INITIAL_RAW_MAX);

        // One step below the top is within the threshold of 2
        assert_eq!(exp.update(INITIAL_RAW_MAX - 400), None);
        assert_eq!(exp.value(), 127);
    }

    #[test]
    fn test_reverse_polarity() {
        let cfg = ExpressionConfig { polarity: Polarity::Reverse, ..ExpressionConfig::default_for(0) };
        let mut exp = pedal(cfg);

        assert_eq!(exp.update(INITIAL_RAW_MIN), cc(127));
        assert_eq!(exp.update(INITIAL_RAW_MAX), cc(0));
    }

    #[test]
    fn test_calibration_widens() {
        let mut exp = pedal(ExpressionConfig::default_for(0));
        exp.update(100);
        exp.update(65000);
        assert_eq!(exp.calibration(), (100, 65000));
    }

    #[test]
    fn test_output_range_mapping() {
        let cfg = ExpressionConfig { min: 20, max: 40, ..ExpressionConfig::default_for(0) };
        let mut exp = pedal(cfg);

        assert_eq!(exp.update(INITIAL_RAW_MIN), cc(20));
        assert_eq!(exp.update(INITIAL_RAW_MAX), cc(40));
    }
}
