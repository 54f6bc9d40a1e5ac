//! Per-button state machine

use tracing::trace;

use crate::color::Rgb;
use crate::config::{ButtonConfig, ButtonMode, Effective, MessageConfig, OffMode};
use crate::midi::MidiMessage;

/// Ticks a program-change button stays lit after a press
pub const FLASH_TICKS: u16 = 100;

/// Threshold at which a host value counts as "on"
const HOST_ON_THRESHOLD: u8 = 63;

/// Mutable state of one button, owning its resolved config
#[derive(Debug, Clone)]
pub struct ButtonRuntimeState {
    config: ButtonConfig,
    is_active: bool,
    /// 1-indexed, always in `1..=config.keytimes`
    current_keytime: u8,
    pc_value: u8,
    flash_remaining: u16,
}

impl ButtonRuntimeState {
    pub fn new(config: ButtonConfig) -> Self {
        Self {
            config,
            is_active: false,
            current_keytime: 1,
            pc_value: 0,
            flash_remaining: 0,
        }
    }

    pub fn config(&self) -> &ButtonConfig {
        &self.config
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn channel(&self) -> u8 {
        self.config.channel
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn current_keytime(&self) -> u8 {
        self.current_keytime
    }

    pub fn pc_value(&self) -> u8 {
        self.pc_value
    }

    pub fn flash_remaining(&self) -> u16 {
        self.flash_remaining
    }

    /// Color and message fields for the current keytime
    pub fn effective(&self) -> Effective {
        self.config.effective(self.current_keytime)
    }

    /// Handle a physical press, returning the message to send
    ///
    /// Every press produces a message; only releases can be silent.
    pub fn on_press(&mut self) -> MidiMessage {
        let cycling = self.config.keytimes > 1;
        if cycling {
            self.current_keytime = self.current_keytime % self.config.keytimes + 1;
        }

        let channel = self.config.channel;
        let message = self.effective().message;

        let out = match message {
            MessageConfig::Cc { cc, cc_on, cc_off } => {
                let on = self.latch(cycling);
                MidiMessage::ControlChange {
                    channel,
                    cc,
                    value: if on { cc_on } else { cc_off },
                }
            }
            MessageConfig::Note { note, velocity_on, velocity_off } => {
                if self.latch(cycling) {
                    MidiMessage::NoteOn { channel, note, velocity: velocity_on }
                } else {
                    MidiMessage::NoteOff { channel, note, velocity: velocity_off }
                }
            }
            MessageConfig::ProgramChange { program } => {
                self.flash_remaining = FLASH_TICKS;
                MidiMessage::ProgramChange { channel, program }
            }
            MessageConfig::ProgramChangeInc { pc_step } => {
                self.pc_value = self.pc_value.saturating_add(pc_step).min(127);
                self.flash_remaining = FLASH_TICKS;
                MidiMessage::ProgramChange { channel, program: self.pc_value }
            }
            MessageConfig::ProgramChangeDec { pc_step } => {
                self.pc_value = self.pc_value.saturating_sub(pc_step);
                self.flash_remaining = FLASH_TICKS;
                MidiMessage::ProgramChange { channel, program: self.pc_value }
            }
        };

        trace!(
            "Button '{}' pressed at keytime {}/{} -> {}",
            self.config.label,
            self.current_keytime,
            self.config.keytimes,
            out
        );
        out
    }

    /// Update `is_active` for a CC/Note press and return the new value
    ///
    /// Advancing to a new keytime always lands on that state's "on" value.
    fn latch(&mut self, cycling: bool) -> bool {
        self.is_active = match self.config.mode {
            ButtonMode::Momentary => true,
            ButtonMode::Toggle if cycling => true,
            ButtonMode::Toggle => !self.is_active,
        };
        self.is_active
    }

    /// Handle a physical release; only momentary CC/Note buttons respond
    pub fn on_release(&mut self) -> Option<MidiMessage> {
        if self.config.mode != ButtonMode::Momentary {
            return None;
        }

        let channel = self.config.channel;
        let out = match self.effective().message {
            MessageConfig::Cc { cc, cc_off, .. } => MidiMessage::ControlChange {
                channel,
                cc,
                value: cc_off,
            },
            MessageConfig::Note { note, velocity_off, .. } => MidiMessage::NoteOff {
                channel,
                note,
                velocity: velocity_off,
            },
            _ => return None,
        };

        self.is_active = false;
        trace!("Button '{}' released -> {}", self.config.label, out);
        Some(out)
    }

    /// Advance timers by one loop iteration
    pub fn tick(&mut self) {
        self.flash_remaining = self.flash_remaining.saturating_sub(1);
    }

    /// Host-authoritative override for CC/Note buttons
    ///
    /// Returns true when the state was updated.
    pub fn apply_host_value(&mut self, value: u8, channel: u8) -> bool {
        if channel != self.config.channel || self.config.message.is_program_family() {
            return false;
        }
        self.is_active = value > HOST_ON_THRESHOLD;
        true
    }

    /// Host program sync for increment/decrement buttons
    pub fn apply_host_program(&mut self, value: u8, channel: u8) -> bool {
        if channel != self.config.channel {
            return false;
        }
        match self.config.message {
            MessageConfig::ProgramChangeInc { .. } | MessageConfig::ProgramChangeDec { .. } => {
                self.pc_value = value.min(127);
                true
            }
            _ => false,
        }
    }

    /// Color the LED should show right now
    pub fn led_color(&self) -> Rgb {
        let color = self.effective().color.rgb();
        if self.flash_remaining > 0 || self.is_active {
            return color;
        }
        match self.config.off_mode {
            OffMode::Dim => color.dim(),
            OffMode::Off => Rgb::BLACK,
        }
    }
}
