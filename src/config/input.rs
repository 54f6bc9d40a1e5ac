//! Encoder and expression pedal configuration

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Rotary encoder configuration (STD10 only)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EncoderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_encoder_cc")]
    pub cc: u8,
    #[serde(default = "default_encoder_label")]
    pub label: String,
    #[serde(default)]
    pub min: u8,
    #[serde(default = "default_max")]
    pub max: u8,
    #[serde(default = "default_initial")]
    pub initial: u8,
    /// Number of discrete output slots; `None` sends every value
    #[serde(default)]
    pub steps: Option<u8>,
    #[serde(default)]
    pub channel: Option<u8>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cc: default_encoder_cc(),
            label: default_encoder_label(),
            min: 0,
            max: default_max(),
            initial: default_initial(),
            steps: None,
            channel: None,
        }
    }
}

impl EncoderConfig {
    /// Repair ranges so `min <= initial <= max <= 127`
    pub fn normalized(mut self) -> Self {
        self.cc = self.cc.min(127);
        self.max = self.max.min(127);
        if self.min > self.max {
            warn!("Encoder min {} above max {}, swapping", self.min, self.max);
            std::mem::swap(&mut self.min, &mut self.max);
        }
        self.initial = self.initial.clamp(self.min, self.max);
        self.steps = self.steps.filter(|s| *s > 1).map(|s| s.min(128));
        self.channel = self.channel.map(|c| c.min(15));
        self
    }
}

/// Expression pedal polarity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Normal,
    #[serde(alias = "inverted")]
    Reverse,
}

/// Expression pedal configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExpressionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub cc: u8,
    pub label: String,
    #[serde(default)]
    pub min: u8,
    #[serde(default = "default_max")]
    pub max: u8,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default)]
    pub channel: Option<u8>,
}

impl ExpressionConfig {
    /// Defaults for pedal 1 or 2
    pub fn default_for(pedal: usize) -> Self {
        Self {
            enabled: true,
            cc: 12 + pedal as u8,
            label: format!("EXP{}", pedal + 1),
            min: 0,
            max: default_max(),
            polarity: Polarity::Normal,
            threshold: default_threshold(),
            channel: None,
        }
    }

    /// Parse one pedal entry, filling fields the record leaves out
    pub fn from_raw(raw: Option<&Value>, pedal: usize) -> Self {
        let defaults = Self::default_for(pedal);
        let Some(Value::Object(obj)) = raw else {
            return defaults;
        };

        let mut merged = match serde_json::to_value(&defaults) {
            Ok(Value::Object(base)) => base,
            _ => return defaults,
        };
        for (k, v) in obj {
            merged.insert(k.clone(), v.clone());
        }

        match serde_json::from_value::<Self>(Value::Object(merged)) {
            Ok(cfg) => cfg.normalized(),
            Err(e) => {
                warn!("Invalid expression pedal {} config ({}), using defaults", pedal + 1, e);
                defaults
            }
        }
    }

    fn normalized(mut self) -> Self {
        self.cc = self.cc.min(127);
        self.min = self.min.min(127);
        self.max = self.max.min(127);
        self.threshold = self.threshold.max(1);
        self.channel = self.channel.map(|c| c.min(15));
        self
    }
}

/// Parse the encoder section, falling back to defaults on malformed input
pub fn encoder_from_raw(raw: Option<&Value>) -> EncoderConfig {
    match raw {
        None | Some(Value::Null) => EncoderConfig::default(),
        Some(value) => match serde_json::from_value::<EncoderConfig>(value.clone()) {
            Ok(cfg) => cfg.normalized(),
            Err(e) => {
                warn!("Invalid encoder config ({}), using defaults", e);
                EncoderConfig::default()
            }
        },
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_encoder_cc() -> u8 { 11 }
fn default_encoder_label() -> String { "ENC".to_string() }
fn default_max() -> u8 { 127 }
fn default_initial() -> u8 { 64 }
fn default_threshold() -> u8 { 2 }

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encoder_defaults() {
        let enc = encoder_from_raw(None);
        assert!(enc.enabled);
        assert_eq!(enc.cc, 11);
        assert_eq!(enc.initial, 64);
        assert_eq!(enc.steps, None);
    }

    #[test]
    fn test_encoder_repairs_ranges() {
        let enc = encoder_from_raw(Some(&json!({"min": 100, "max": 20, "initial": 5, "steps": 1})));
        assert_eq!((enc.min, enc.max), (20, 100));
        assert_eq!(enc.initial, 20);
        assert_eq!(enc.steps, None);
    }

    #[test]
    fn test_encoder_malformed_uses_defaults() {
        let enc = encoder_from_raw(Some(&json!({"cc": "eleven"})));
        assert_eq!(enc, EncoderConfig::default());
    }

    #[test]
    fn test_expression_partial_record() {
        let exp = ExpressionConfig::from_raw(Some(&json!({"cc": 30, "polarity": "reverse"})), 1);
        assert_eq!(exp.cc, 30);
        assert_eq!(exp.label, "EXP2");
        assert_eq!(exp.polarity, Polarity::Reverse);
        assert_eq!(exp.threshold, 2);

        let inverted = ExpressionConfig::from_raw(Some(&json!({"polarity": "inverted"})), 0);
        assert_eq!(inverted.polarity, Polarity::Reverse);
        assert_eq!(inverted.cc, 12);
    }
}
