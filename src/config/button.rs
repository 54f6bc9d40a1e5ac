//! Resolved button configuration types
//!
//! A `ButtonConfig` is produced once per load by the resolver and never
//! mutated afterwards. The message kind is a tagged union so the dispatch
//! path never branches on type strings.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::color::Color;

/// Button trigger mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ButtonMode {
    #[default]
    Toggle,
    Momentary,
}

impl ButtonMode {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toggle" => Some(ButtonMode::Toggle),
            "momentary" => Some(ButtonMode::Momentary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonMode::Toggle => "toggle",
            ButtonMode::Momentary => "momentary",
        }
    }
}

/// LED behavior when the button is off
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OffMode {
    #[default]
    Dim,
    Off,
}

impl OffMode {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dim" => Some(OffMode::Dim),
            "off" => Some(OffMode::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OffMode::Dim => "dim",
            OffMode::Off => "off",
        }
    }
}

/// Message type selector as written in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Cc,
    Note,
    ProgramChange,
    ProgramChangeInc,
    ProgramChangeDec,
}

impl MessageKind {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cc" | "control_change" => Some(MessageKind::Cc),
            "note" => Some(MessageKind::Note),
            "pc" | "program_change" => Some(MessageKind::ProgramChange),
            "pc_inc" => Some(MessageKind::ProgramChangeInc),
            "pc_dec" => Some(MessageKind::ProgramChangeDec),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Cc => "cc",
            MessageKind::Note => "note",
            MessageKind::ProgramChange => "pc",
            MessageKind::ProgramChangeInc => "pc_inc",
            MessageKind::ProgramChangeDec => "pc_dec",
        }
    }

    /// Type-specific field names a keytime state may override
    pub fn override_fields(&self) -> &'static [&'static str] {
        match self {
            MessageKind::Cc => &["cc", "cc_on", "cc_off"],
            MessageKind::Note => &["note", "velocity_on", "velocity_off"],
            MessageKind::ProgramChange => &["program"],
            MessageKind::ProgramChangeInc | MessageKind::ProgramChangeDec => &["pc_step"],
        }
    }
}

/// Type-specific fields of a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageConfig {
    Cc { cc: u8, cc_on: u8, cc_off: u8 },
    Note { note: u8, velocity_on: u8, velocity_off: u8 },
    ProgramChange { program: u8 },
    ProgramChangeInc { pc_step: u8 },
    ProgramChangeDec { pc_step: u8 },
}

impl MessageConfig {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageConfig::Cc { .. } => MessageKind::Cc,
            MessageConfig::Note { .. } => MessageKind::Note,
            MessageConfig::ProgramChange { .. } => MessageKind::ProgramChange,
            MessageConfig::ProgramChangeInc { .. } => MessageKind::ProgramChangeInc,
            MessageConfig::ProgramChangeDec { .. } => MessageKind::ProgramChangeDec,
        }
    }

    /// True for the three program-change kinds, which flash instead of latching
    pub fn is_program_family(&self) -> bool {
        !matches!(self, MessageConfig::Cc { .. } | MessageConfig::Note { .. })
    }

    /// Apply a state's overrides; fields for other kinds are ignored
    pub fn merged(&self, o: &StateOverride) -> MessageConfig {
        match *self {
            MessageConfig::Cc { cc, cc_on, cc_off } => MessageConfig::Cc {
                cc: o.cc.unwrap_or(cc),
                cc_on: o.cc_on.unwrap_or(cc_on),
                cc_off: o.cc_off.unwrap_or(cc_off),
            },
            MessageConfig::Note { note, velocity_on, velocity_off } => MessageConfig::Note {
                note: o.note.unwrap_or(note),
                velocity_on: o.velocity_on.unwrap_or(velocity_on),
                velocity_off: o.velocity_off.unwrap_or(velocity_off),
            },
            MessageConfig::ProgramChange { program } => MessageConfig::ProgramChange {
                program: o.program.unwrap_or(program),
            },
            MessageConfig::ProgramChangeInc { pc_step } => MessageConfig::ProgramChangeInc {
                pc_step: o.pc_step.unwrap_or(pc_step),
            },
            MessageConfig::ProgramChangeDec { pc_step } => MessageConfig::ProgramChangeDec {
                pc_step: o.pc_step.unwrap_or(pc_step),
            },
        }
    }

    fn write_fields(&self, obj: &mut Map<String, Value>) {
        match *self {
            MessageConfig::Cc { cc, cc_on, cc_off } => {
                obj.insert("cc".into(), cc.into());
                obj.insert("cc_on".into(), cc_on.into());
                obj.insert("cc_off".into(), cc_off.into());
            }
            MessageConfig::Note { note, velocity_on, velocity_off } => {
                obj.insert("note".into(), note.into());
                obj.insert("velocity_on".into(), velocity_on.into());
                obj.insert("velocity_off".into(), velocity_off.into());
            }
            MessageConfig::ProgramChange { program } => {
                obj.insert("program".into(), program.into());
            }
            MessageConfig::ProgramChangeInc { pc_step }
            | MessageConfig::ProgramChangeDec { pc_step } => {
                obj.insert("pc_step".into(), pc_step.into());
            }
        }
    }
}

/// Partial override for one keytime position
///
/// Only the fields valid for the button's kind are ever populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateOverride {
    pub color: Option<Color>,
    pub cc: Option<u8>,
    pub cc_on: Option<u8>,
    pub cc_off: Option<u8>,
    pub note: Option<u8>,
    pub velocity_on: Option<u8>,
    pub velocity_off: Option<u8>,
    pub program: Option<u8>,
    pub pc_step: Option<u8>,
}

impl StateOverride {
    pub(crate) fn set(&mut self, field: &str, value: u8) {
        let slot = match field {
            "cc" => &mut self.cc,
            "cc_on" => &mut self.cc_on,
            "cc_off" => &mut self.cc_off,
            "note" => &mut self.note,
            "velocity_on" => &mut self.velocity_on,
            "velocity_off" => &mut self.velocity_off,
            "program" => &mut self.program,
            "pc_step" => &mut self.pc_step,
            _ => return,
        };
        *slot = Some(value);
    }

    fn to_raw(&self) -> Value {
        let mut obj = Map::new();
        if let Some(color) = self.color {
            obj.insert("color".into(), color.as_str().into());
        }
        let fields = [
            ("cc", self.cc),
            ("cc_on", self.cc_on),
            ("cc_off", self.cc_off),
            ("note", self.note),
            ("velocity_on", self.velocity_on),
            ("velocity_off", self.velocity_off),
            ("program", self.program),
            ("pc_step", self.pc_step),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                obj.insert(name.into(), v.into());
            }
        }
        Value::Object(obj)
    }
}

/// Color and message fields in effect at one keytime position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effective {
    pub color: Color,
    pub message: MessageConfig,
}

/// Complete, validated configuration for one button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonConfig {
    pub label: String,
    pub color: Color,
    pub mode: ButtonMode,
    pub off_mode: OffMode,
    /// MIDI channel, 0-15
    pub channel: u8,
    pub message: MessageConfig,
    /// Number of keytime positions, 1-99
    pub keytimes: u8,
    /// Per-keytime overrides, at most `keytimes` entries
    pub states: Vec<StateOverride>,
}

impl ButtonConfig {
    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }

    /// Fields in effect at a 1-indexed keytime position
    pub fn effective(&self, keytime: u8) -> Effective {
        let state = keytime
            .checked_sub(1)
            .and_then(|i| self.states.get(i as usize));

        match state {
            Some(o) => Effective {
                color: o.color.unwrap_or(self.color),
                message: self.message.merged(o),
            },
            None => Effective {
                color: self.color,
                message: self.message,
            },
        }
    }

    /// Render back to the raw record schema accepted by the resolver
    pub fn to_raw(&self) -> Value {
        let mut obj = match json!({
            "label": self.label,
            "color": self.color.as_str(),
            "mode": self.mode.as_str(),
            "off_mode": self.off_mode.as_str(),
            "channel": self.channel,
            "type": self.kind().as_str(),
            "keytimes": self.keytimes,
        }) {
            Value::Object(obj) => obj,
            _ => Map::new(),
        };
        self.message.write_fields(&mut obj);
        if self.keytimes > 1 {
            let states = self.states.iter().map(StateOverride::to_raw).collect();
            obj.insert("states".into(), Value::Array(states));
        }
        Value::Object(obj)
    }
}
