//! MIDI Captain - control core for a configurable MIDI foot controller
//!
//! Turns footswitch presses into outgoing MIDI and host MIDI into button
//! state and LED colors. Hardware access sits behind the traits in
//! [`drivers`]; [`router::DispatchEngine`] ties everything together one
//! tick at a time.

pub mod color;
pub mod config;
pub mod drivers;
pub mod error;
pub mod input;
pub mod midi;
pub mod router;
pub mod state;

pub use color::{Color, Rgb};
pub use config::{ButtonConfig, DeviceConfig, DeviceKind, MessageConfig, ResolvedConfig};
pub use error::{ConfigError, DispatchError, TransportError};
pub use midi::MidiMessage;
pub use router::DispatchEngine;
pub use state::ButtonRuntimeState;
