//! Error types for the control core
//!
//! None of these ever stop the dispatch loop: config problems are repaired by
//! the resolver, dispatch and transport problems drop the offending event.

use thiserror::Error;

/// A malformed or out-of-range field in a raw button record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Field present but not of the expected JSON type
    #[error("button {button}: field '{field}' has invalid value {value}, using default")]
    InvalidType {
        button: usize,
        field: &'static str,
        value: String,
    },

    /// Integer outside the field's range
    #[error("button {button}: field '{field}' value {value} out of range, clamped to {clamped}")]
    OutOfRange {
        button: usize,
        field: &'static str,
        value: i64,
        clamped: i64,
    },

    /// Unrecognized enum string (type, mode, color, ...)
    #[error("button {button}: unknown {field} '{value}', using default")]
    UnknownVariant {
        button: usize,
        field: &'static str,
        value: String,
    },
}

/// An event the engine could not route
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Switch edge for a button that does not exist
    #[error("edge for button {index} but only {count} buttons configured")]
    UnknownButton { index: usize, count: usize },

    /// Inbound message type with no host-sync meaning
    #[error("unsupported inbound message type '{0}'")]
    UnsupportedMessage(&'static str),
}

/// Errors from the MIDI link
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Byte stream did not decode to a message
    #[error("malformed MIDI data: {0}")]
    Malformed(String),

    /// Port closed or never connected
    #[error("MIDI port disconnected: {0}")]
    Disconnected(String),

    /// Underlying port rejected the write
    #[error("MIDI send failed: {0}")]
    Send(String),
}
