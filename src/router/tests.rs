//! Tests for the dispatch engine

use super::*;
use crate::color::{Color, Rgb};
use crate::config::DeviceConfig;
use crate::drivers::{LoopbackMidi, PixelStrip, ScriptedAnalog, ScriptedSwitches};
use crate::error::TransportError;
use crate::state::FLASH_TICKS;
use serde_json::{json, Value};

struct Rig {
    engine: DispatchEngine,
    midi: LoopbackMidi,
    switches: ScriptedSwitches,
    strip: PixelStrip,
    analog: ScriptedAnalog,
}

fn config(device: &str, buttons: Vec<Value>) -> ResolvedConfig {
    DeviceConfig {
        device: Some(json!(device)),
        buttons,
        ..Default::default()
    }
    .resolve()
}

fn rig(config: ResolvedConfig) -> Rig {
    let midi = LoopbackMidi::new();
    let switches = ScriptedSwitches::new();
    let strip = PixelStrip::new(config.device.button_count(), config.device.pixels_per_button());
    let analog = ScriptedAnalog::new();

    let engine = DispatchEngine::new(
        config,
        Box::new(switches.clone()),
        Box::new(midi.clone()),
        Box::new(strip.clone()),
    )
    .with_analog(Box::new(analog.clone()));

    Rig { engine, midi, switches, strip, analog }
}

fn cc(cc: u8, value: u8) -> MidiMessage {
    MidiMessage::ControlChange { channel: 0, cc, value }
}

#[test]
fn test_toggle_press_sends_and_lights() {
    let mut r = rig(config("mini6", vec![json!({"type": "cc", "cc": 20, "color": "red"})]));

    r.engine.tick();
    assert_eq!(r.strip.button_color(0), Some(Color::Red.rgb().dim()));
    assert!(r.midi.take_sent().is_empty());

    r.switches.tap(0);
    r.engine.tick();
    assert_eq!(r.midi.take_sent(), vec![cc(20, 127)]);
    assert_eq!(r.strip.button_color(0), Some(Color::Red.rgb()));

    r.switches.tap(0);
    r.engine.tick();
    assert_eq!(r.midi.take_sent(), vec![cc(20, 0)]);
    assert!(!r.engine.buttons()[0].is_active());
}

#[test]
fn test_keytime_colors_follow_presses() {
    let mut r = rig(config(
        "mini6",
        vec![json!({
            "type": "cc", "cc": 20, "keytimes": 3,
            "states": [{"color": "blue"}, {"color": "cyan"}, {"color": "white"}]
        })],
    ));

    let mut colors = Vec::new();
    for _ in 0..3 {
        r.switches.press(0);
        r.engine.tick();
        colors.push(r.strip.button_color(0));
    }

    assert_eq!(
        colors,
        vec![
            Some(Color::Cyan.rgb()),
            Some(Color::White.rgb()),
            Some(Color::Blue.rgb()),
        ]
    );
    assert_eq!(r.midi.take_sent(), vec![cc(20, 127); 3]);
    assert_eq!(r.engine.buttons()[0].current_keytime(), 1);
}

#[test]
fn test_host_override_without_press() {
    let mut r = rig(config("mini6", vec![json!({"cc": 20, "channel": 0, "color": "green"})]));

    r.midi.inject(cc(20, 127));
    r.engine.tick();

    assert!(r.engine.buttons()[0].is_active());
    assert_eq!(r.strip.button_color(0), Some(Color::Green.rgb()));
    // Host feedback is never echoed
    assert!(r.midi.take_sent().is_empty());

    r.midi.inject_bytes(&[0xB0, 20, 0]);
    r.engine.tick();
    assert!(!r.engine.buttons()[0].is_active());
}

#[test]
fn test_local_press_wins_within_tick() {
    let mut r = rig(config("mini6", vec![json!({"cc": 20})]));

    // Host turns it on, user presses in the same tick: press toggles off
    r.midi.inject(cc(20, 127));
    r.switches.press(0);
    r.engine.tick();

    assert!(!r.engine.buttons()[0].is_active());
    assert_eq!(r.midi.take_sent(), vec![cc(20, 0)]);
}

#[test]
fn test_host_state_persists_across_ticks() {
    let mut r = rig(config("mini6", vec![json!({"cc": 20})]));

    r.midi.inject(cc(20, 100));
    for _ in 0..5 {
        r.engine.tick();
    }
    assert!(r.engine.buttons()[0].is_active());
}

#[test]
fn test_pc_increment_clamps() {
    let mut r = rig(config("mini6", vec![json!({"type": "pc_inc", "pc_step": 10})]));

    r.midi.inject(MidiMessage::ProgramChange { channel: 0, program: 125 });
    r.engine.tick();
    assert_eq!(r.engine.buttons()[0].pc_value(), 125);

    r.switches.press(0);
    r.engine.tick();
    assert_eq!(r.midi.take_sent(), vec![MidiMessage::ProgramChange { channel: 0, program: 127 }]);
    assert_eq!(r.engine.buttons()[0].pc_value(), 127);
}

#[test]
fn test_momentary_press_release() {
    let mut r = rig(config(
        "mini6",
        vec![json!({"type": "cc", "cc": 20, "mode": "momentary", "cc_on": 127, "cc_off": 0})],
    ));

    r.switches.press(0);
    r.engine.tick();
    assert!(r.engine.buttons()[0].is_active());

    r.switches.release(0);
    r.engine.tick();
    assert!(!r.engine.buttons()[0].is_active());
    assert_eq!(r.midi.take_sent(), vec![cc(20, 127), cc(20, 0)]);
}

#[test]
fn test_program_flash_expires() {
    let mut r = rig(config("mini6", vec![json!({"type": "pc", "program": 5, "color": "purple"})]));

    r.switches.tap(0);
    r.engine.tick();
    assert_eq!(r.strip.button_color(0), Some(Color::Purple.rgb()));
    // The press tick already counted down once
    assert_eq!(r.engine.buttons()[0].flash_remaining(), FLASH_TICKS - 1);

    for _ in 1..FLASH_TICKS {
        r.engine.tick();
    }
    assert_eq!(r.engine.buttons()[0].flash_remaining(), 0);
    assert_eq!(r.strip.button_color(0), Some(Color::Purple.rgb().dim()));
}

#[test]
fn test_out_of_range_edge_dropped() {
    let mut r = rig(config("mini6", vec![]));

    r.switches.press(6);
    r.switches.press(usize::MAX / 4);
    r.switches.press(0);
    r.engine.tick();

    // The valid edge after the bad ones is still processed
    assert_eq!(r.midi.take_sent(), vec![cc(20, 127)]);
}

#[test]
fn test_unsupported_and_malformed_inbound_ignored() {
    let mut r = rig(config("mini6", vec![json!({"cc": 20})]));

    r.midi.inject(MidiMessage::PitchBend { channel: 0, value: 0 });
    r.midi.inject_error(TransportError::Malformed("stray data byte".into()));
    r.midi.inject(cc(20, 127));
    r.engine.tick();

    assert!(r.engine.buttons()[0].is_active());
    assert_eq!(r.midi.pending_inbound(), 0);
}

#[test]
fn test_send_failure_does_not_halt() {
    let mut r = rig(config("mini6", vec![json!({"cc": 20})]));

    r.midi.set_send_failure(true);
    r.switches.press(0);
    r.engine.tick();
    assert!(r.engine.buttons()[0].is_active());

    r.midi.set_send_failure(false);
    r.switches.press(0);
    r.engine.tick();
    assert_eq!(r.midi.take_sent(), vec![cc(20, 0)]);
}

#[test]
fn test_drain_is_bounded() {
    let mut r = rig(config("mini6", vec![json!({"mode": "momentary"})]));

    for _ in 0..MAX_EVENTS_PER_TICK + 10 {
        r.midi.inject(cc(99, 0));
        r.switches.press(0);
    }
    r.engine.tick();

    assert_eq!(r.midi.pending_inbound(), 10);
    assert_eq!(r.switches.pending(), 10);
    assert_eq!(r.midi.take_sent().len(), MAX_EVENTS_PER_TICK);

    r.engine.tick();
    assert_eq!(r.midi.pending_inbound(), 0);
    assert_eq!(r.switches.pending(), 0);
}

#[test]
fn test_leds_flushed_every_tick() {
    let mut r = rig(config("mini6", vec![json!({"color": "blue", "off_mode": "off"})]));

    r.engine.tick();
    r.engine.tick();
    assert_eq!(r.strip.flush_count(), 2);
    assert_eq!(r.engine.ticks(), 2);
    assert_eq!(r.strip.button_color(0), Some(Rgb::BLACK));
    // Default buttons fill the rest of the strip
    assert_eq!(r.strip.button_color(5), Some(Color::White.rgb().dim()));
}

#[test]
fn test_reload_rebuilds_state() {
    let mut r = rig(config("mini6", vec![json!({"cc": 20})]));

    r.switches.press(0);
    r.engine.tick();
    assert!(r.engine.buttons()[0].is_active());
    r.midi.take_sent();

    r.engine.reload(config("mini6", vec![json!({"type": "note", "note": 50})]));
    assert!(!r.engine.buttons()[0].is_active());

    r.switches.press(0);
    r.engine.tick();
    assert_eq!(
        r.midi.take_sent(),
        vec![MidiMessage::NoteOn { channel: 0, note: 50, velocity: 127 }]
    );
}

#[test]
fn test_encoder_and_pedals() {
    let mut r = rig(config("std10", vec![]));

    r.analog.turn_encoder(2);
    r.analog.set_expression(0, 63488);
    r.engine.tick();

    assert_eq!(r.midi.take_sent(), vec![cc(11, 66), cc(12, 127)]);
    assert_eq!(r.engine.analog().encoder.as_ref().map(|e| e.value()), Some(66));

    // No movement, no messages
    r.engine.tick();
    assert!(r.midi.take_sent().is_empty());
}

#[test]
fn test_encoder_push_momentary() {
    let mut r = rig(config("std10", vec![]));

    r.analog.push_encoder(EdgeKind::Press);
    r.engine.tick();
    r.analog.push_encoder(EdgeKind::Release);
    r.engine.tick();

    assert_eq!(r.midi.take_sent(), vec![cc(14, 127), cc(14, 0)]);
}

#[test]
fn test_mini6_has_no_analog() {
    let mut r = rig(config("mini6", vec![]));
    assert!(r.engine.analog().is_empty());

    r.analog.turn_encoder(5);
    r.analog.push_encoder(EdgeKind::Press);
    r.engine.tick();
    assert!(r.midi.take_sent().is_empty());
}

#[test]
fn test_encoder_push_follows_host() {
    let mut r = rig(config("std10", vec![]));
    let push_active = |r: &Rig| r.engine.analog().encoder_push.as_ref().map(|p| p.is_active());

    r.midi.inject(cc(14, 127));
    r.engine.tick();
    assert_eq!(push_active(&r), Some(true));
    assert!(r.midi.take_sent().is_empty());

    r.midi.inject(cc(14, 0));
    r.engine.tick();
    assert_eq!(push_active(&r), Some(false));
}

#[test]
fn test_reload_to_smaller_device_blanks_leds() {
    let mut r = rig(config("std10", vec![]));
    r.engine.tick();
    assert_eq!(r.strip.button_color(9), Some(Color::White.rgb().dim()));

    r.engine.reload(config("mini6", vec![]));
    assert_eq!(r.engine.device(), DeviceKind::Mini6);
    for i in 6..10 {
        assert_eq!(r.strip.button_color(i), Some(Rgb::BLACK));
    }

    r.engine.tick();
    assert_eq!(r.strip.button_color(5), Some(Color::White.rgb().dim()));
    assert_eq!(r.strip.button_color(9), Some(Rgb::BLACK));
}
