//! Host feedback: inbound MIDI to button state

use tracing::trace;

use crate::config::MessageConfig;
use crate::error::DispatchError;
use crate::midi::MidiMessage;
use crate::state::ButtonRuntimeState;

/// Routes decoded host messages to every matching button
pub struct HostSyncHandler;

impl HostSyncHandler {
    /// Apply one message; returns how many buttons were updated
    ///
    /// Buttons match on channel plus the number in effect at their current
    /// keytime. Every match is updated, not just the first.
    pub fn apply(
        buttons: &mut [ButtonRuntimeState],
        msg: &MidiMessage,
    ) -> Result<usize, DispatchError> {
        let updated = match *msg {
            MidiMessage::ControlChange { channel, cc, value } => {
                Self::apply_value(buttons, channel, value, |m| {
                    matches!(m, MessageConfig::Cc { cc: n, .. } if *n == cc)
                })
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                Self::apply_value(buttons, channel, velocity, |m| {
                    matches!(m, MessageConfig::Note { note: n, .. } if *n == note)
                })
            }
            MidiMessage::NoteOff { channel, note, .. } => {
                Self::apply_value(buttons, channel, 0, |m| {
                    matches!(m, MessageConfig::Note { note: n, .. } if *n == note)
                })
            }
            MidiMessage::ProgramChange { channel, program } => buttons
                .iter_mut()
                .filter(|b| b.channel() == channel)
                .map(|b| b.apply_host_program(program, channel))
                .filter(|applied| *applied)
                .count(),
            other => return Err(DispatchError::UnsupportedMessage(other.kind())),
        };

        trace!("Host {} updated {} button(s)", msg, updated);
        Ok(updated)
    }

    fn apply_value(
        buttons: &mut [ButtonRuntimeState],
        channel: u8,
        value: u8,
        matches: impl Fn(&MessageConfig) -> bool,
    ) -> usize {
        buttons
            .iter_mut()
            .filter(|b| b.channel() == channel && matches(&b.effective().message))
            .map(|b| b.apply_host_value(value, channel))
            .filter(|applied| *applied)
            .count()
    }
}
