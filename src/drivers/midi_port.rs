//! MIDI transport over system ports (midir)
//!
//! midir delivers input on its own callback thread. The callback decodes
//! bytes with a running-status decoder and forwards results through a
//! crossbeam channel that `receive` drains without blocking.

use anyhow::{anyhow, Context, Result};
use crossbeam::channel::{self, Receiver, TryRecvError};
use midir::{MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::{debug, info, warn};

use super::MidiTransport;
use crate::error::TransportError;
use crate::midi::{format_hex, MidiMessage, StreamDecoder};

const CLIENT_NAME: &str = "MIDI-Captain";

/// Find a port by case-insensitive substring match
pub fn find_port<T: MidiIO>(io: &T, pattern: &str) -> Option<(T::Port, String)> {
    let pattern = pattern.to_lowercase();
    io.ports().into_iter().find_map(|port| {
        let name = io.port_name(&port).ok()?;
        if name.to_lowercase().contains(&pattern) {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
            Some((port, name))
        } else {
            None
        }
    })
}

fn port_names<T: MidiIO>(io: &T) -> Vec<String> {
    io.ports()
        .iter()
        .filter_map(|port| io.port_name(port).ok())
        .collect()
}

/// Names of all (input, output) ports
pub fn list_ports() -> Result<(Vec<String>, Vec<String>)> {
    let midi_in = MidiInput::new(CLIENT_NAME).context("Failed to create MIDI input client")?;
    let midi_out = MidiOutput::new(CLIENT_NAME).context("Failed to create MIDI output client")?;
    Ok((port_names(&midi_in), port_names(&midi_out)))
}

/// Host link over a pair of system MIDI ports
pub struct MidiPortTransport {
    _input: Option<MidiInputConnection<()>>,
    output: Option<MidiOutputConnection>,
    inbound: Receiver<Result<MidiMessage, TransportError>>,
    output_name: String,
}

impl MidiPortTransport {
    /// Connect to ports matching the given patterns; `None` leaves that
    /// direction closed
    pub fn connect(input_pattern: Option<&str>, output_pattern: Option<&str>) -> Result<Self> {
        let (tx, inbound) = channel::unbounded();

        let input = match input_pattern {
            Some(pattern) => {
                let midi_in = MidiInput::new(CLIENT_NAME)?;
                let (port, name) = find_port(&midi_in, pattern)
                    .ok_or_else(|| anyhow!("Input port '{}' not found", pattern))?;

                let mut decoder = StreamDecoder::new();
                let conn = midi_in
                    .connect(
                        &port,
                        "midi-captain-in",
                        move |_timestamp, data, _| {
                            debug!("RX <- {}", format_hex(data));
                            for result in decoder.feed(data) {
                                // Receiver gone means the transport was dropped
                                if tx.send(result).is_err() {
                                    return;
                                }
                            }
                        },
                        (),
                    )
                    .map_err(|e| anyhow!("Failed to connect input '{}': {}", name, e))?;

                info!("MIDI input connected: {}", name);
                Some(conn)
            }
            None => None,
        };

        let (output, output_name) = match output_pattern {
            Some(pattern) => {
                let midi_out = MidiOutput::new(CLIENT_NAME)?;
                let (port, name) = find_port(&midi_out, pattern)
                    .ok_or_else(|| anyhow!("Output port '{}' not found", pattern))?;
                let conn = midi_out
                    .connect(&port, "midi-captain-out")
                    .map_err(|e| anyhow!("Failed to connect output '{}': {}", name, e))?;

                info!("MIDI output connected: {}", name);
                (Some(conn), name)
            }
            None => (None, String::new()),
        };

        Ok(Self {
            _input: input,
            output,
            inbound,
            output_name,
        })
    }
}

impl MidiTransport for MidiPortTransport {
    fn receive(&mut self) -> Result<Option<MidiMessage>, TransportError> {
        match self.inbound.try_recv() {
            Ok(result) => result.map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn send(&mut self, msg: &MidiMessage) -> Result<(), TransportError> {
        let Some(conn) = self.output.as_mut() else {
            return Err(TransportError::Disconnected("no output port".into()));
        };

        let bytes = msg.encode();
        debug!("TX -> {}: {}", self.output_name, format_hex(&bytes));
        conn.send(&bytes).map_err(|e| {
            warn!("MIDI send to '{}' failed: {}", self.output_name, e);
            TransportError::Send(e.to_string())
        })
    }
}
