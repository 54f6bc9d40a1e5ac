//! Raw button record → validated `ButtonConfig`
//!
//! The resolver is the only place that judges config validity. It never
//! fails: missing or malformed fields fall back to defaults, out-of-range
//! integers are clamped, and every repair is reported as a warning.

use serde_json::{Map, Value};
use tracing::warn;

use super::button::{ButtonConfig, ButtonMode, MessageConfig, MessageKind, OffMode, StateOverride};
use crate::color::Color;
use crate::error::ConfigError;

pub const MAX_KEYTIMES: u8 = 99;
pub const DEFAULT_CC_BASE: usize = 20;
pub const DEFAULT_NOTE_BASE: usize = 60;

/// Resolve one raw button record
///
/// `index` is the 0-based button position, used for the default label, CC
/// and note. `global_channel` is the config-wide channel, if any.
pub fn resolve(raw: &Value, index: usize, global_channel: Option<u8>) -> ButtonConfig {
    let empty = Map::new();
    let obj = match raw {
        Value::Object(obj) => obj,
        Value::Null => &empty,
        other => {
            report(ConfigError::InvalidType {
                button: index,
                field: "button",
                value: other.to_string(),
            });
            &empty
        }
    };
    let fields = Fields { obj, button: index };

    let label = fields
        .string("label")
        .map(str::to_string)
        .unwrap_or_else(|| (index + 1).to_string());
    let color = fields.named("color", Color::from_name).unwrap_or_default();
    let mode = fields.named("mode", ButtonMode::from_name).unwrap_or_default();
    let off_mode = fields.named("off_mode", OffMode::from_name).unwrap_or_default();
    let channel = fields.int("channel", global_channel.unwrap_or(0).min(15), 0, 15);

    let kind = fields.named("type", MessageKind::from_name).unwrap_or(MessageKind::Cc);
    let message = match kind {
        MessageKind::Cc => MessageConfig::Cc {
            cc: fields.int("cc", index_default(DEFAULT_CC_BASE, index), 0, 127),
            cc_on: fields.int("cc_on", 127, 0, 127),
            cc_off: fields.int("cc_off", 0, 0, 127),
        },
        MessageKind::Note => MessageConfig::Note {
            note: fields.int("note", index_default(DEFAULT_NOTE_BASE, index), 0, 127),
            velocity_on: fields.int("velocity_on", 127, 0, 127),
            velocity_off: fields.int("velocity_off", 0, 0, 127),
        },
        MessageKind::ProgramChange => MessageConfig::ProgramChange {
            program: fields.int("program", 0, 0, 127),
        },
        MessageKind::ProgramChangeInc => MessageConfig::ProgramChangeInc {
            pc_step: fields.int("pc_step", 1, 1, 127),
        },
        MessageKind::ProgramChangeDec => MessageConfig::ProgramChangeDec {
            pc_step: fields.int("pc_step", 1, 1, 127),
        },
    };

    let keytimes = fields.int("keytimes", 1, 1, MAX_KEYTIMES);
    let states = if keytimes > 1 {
        fields.states(kind, keytimes)
    } else {
        Vec::new()
    };

    ButtonConfig {
        label,
        color,
        mode,
        off_mode,
        channel,
        message,
        keytimes,
        states,
    }
}

/// Resolve a list of raw records, one per button
pub fn resolve_all(raw: &[Value], global_channel: Option<u8>) -> Vec<ButtonConfig> {
    raw.iter()
        .enumerate()
        .map(|(i, entry)| resolve(entry, i, global_channel))
        .collect()
}

fn index_default(base: usize, index: usize) -> u8 {
    base.saturating_add(index).min(127) as u8
}

fn report(err: ConfigError) {
    warn!("{}", err);
}

/// Lenient field reader over one JSON object
struct Fields<'a> {
    obj: &'a Map<String, Value>,
    button: usize,
}

impl<'a> Fields<'a> {
    fn string(&self, field: &'static str) -> Option<&'a str> {
        match self.obj.get(field)? {
            Value::String(s) => Some(s.as_str()),
            Value::Null => None,
            other => {
                report(ConfigError::InvalidType {
                    button: self.button,
                    field,
                    value: other.to_string(),
                });
                None
            }
        }
    }

    /// Enum-like string field; unknown names are reported and ignored
    fn named<T>(&self, field: &'static str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let s = self.string(field)?;
        let parsed = parse(s);
        if parsed.is_none() {
            report(ConfigError::UnknownVariant {
                button: self.button,
                field,
                value: s.to_string(),
            });
        }
        parsed
    }

    fn int(&self, field: &'static str, default: u8, min: u8, max: u8) -> u8 {
        match self.obj.get(field) {
            None | Some(Value::Null) => default,
            Some(value) => parse_int(value, self.button, field, min, max).unwrap_or(default),
        }
    }

    fn states(&self, kind: MessageKind, keytimes: u8) -> Vec<StateOverride> {
        let entries = match self.obj.get("states") {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                report(ConfigError::InvalidType {
                    button: self.button,
                    field: "states",
                    value: other.to_string(),
                });
                return Vec::new();
            }
        };

        entries
            .iter()
            .take(keytimes as usize)
            .map(|entry| self.state(entry, kind))
            .collect()
    }

    fn state(&self, entry: &Value, kind: MessageKind) -> StateOverride {
        let mut state = StateOverride::default();
        let obj = match entry {
            Value::Object(obj) => obj,
            _ => return state,
        };

        if let Some(Value::String(name)) = obj.get("color") {
            state.color = Color::from_name(name);
            if state.color.is_none() {
                report(ConfigError::UnknownVariant {
                    button: self.button,
                    field: "color",
                    value: name.clone(),
                });
            }
        }

        for &field in kind.override_fields() {
            let Some(value) = obj.get(field) else { continue };
            let min = if field == "pc_step" { 1 } else { 0 };
            if let Some(v) = parse_int(value, self.button, field, min, 127) {
                state.set(field, v);
            }
        }
        state
    }
}

/// Integer in `[min, max]`; non-integers are rejected, out-of-range clamped
fn parse_int(value: &Value, button: usize, field: &'static str, min: u8, max: u8) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX)),
        _ => None,
    };

    let Some(n) = n else {
        report(ConfigError::InvalidType {
            button,
            field,
            value: value.to_string(),
        });
        return None;
    };

    let clamped = n.clamp(min as i64, max as i64);
    if clamped != n {
        report(ConfigError::OutOfRange {
            button,
            field,
            value: n,
            clamped,
        });
    }
    Some(clamped as u8)
}
