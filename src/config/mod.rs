//! Configuration management for MIDI Captain
//!
//! Handles loading, resolving, and hot-reloading of the device config file.
//! The file is parsed leniently into raw records; `resolver` turns each
//! button record into a validated `ButtonConfig`.

pub mod button;
pub mod input;
pub mod resolver;
pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

pub use button::{ButtonConfig, ButtonMode, Effective, MessageConfig, MessageKind, OffMode, StateOverride};
pub use input::{EncoderConfig, ExpressionConfig, Polarity};
pub use resolver::{resolve, resolve_all};
pub use watcher::ConfigWatcher;

/// Supported hardware variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Std10,
    Mini6,
}

impl DeviceKind {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "std10" => Some(DeviceKind::Std10),
            "mini6" => Some(DeviceKind::Mini6),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Std10 => "std10",
            DeviceKind::Mini6 => "mini6",
        }
    }

    /// Number of footswitches (excluding the encoder push)
    pub fn button_count(&self) -> usize {
        match self {
            DeviceKind::Std10 => 10,
            DeviceKind::Mini6 => 6,
        }
    }

    pub fn has_encoder(&self) -> bool {
        matches!(self, DeviceKind::Std10)
    }

    pub fn has_expression(&self) -> bool {
        matches!(self, DeviceKind::Std10)
    }

    /// NeoPixels per footswitch
    pub fn pixels_per_button(&self) -> usize {
        3
    }
}

/// Root config file structure, as written by the config editor
///
/// Button, encoder and expression sections stay raw JSON so a single bad
/// field never rejects the whole file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Value>,
    /// Channel used by buttons that do not set their own (0-15)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Value>,
    #[serde(default)]
    pub buttons: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<Value>,
}

/// Fully validated configuration, ready to build runtime state from
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub device: DeviceKind,
    pub buttons: Vec<ButtonConfig>,
    pub encoder: Option<EncoderConfig>,
    pub encoder_push: Option<ButtonConfig>,
    pub expression: Vec<ExpressionConfig>,
}

impl DeviceConfig {
    /// Built-in config: buttons labelled 1..n on CC 20+i, white
    pub fn default_for(kind: DeviceKind) -> Self {
        let buttons = (0..kind.button_count())
            .map(|i| json!({"label": (i + 1).to_string(), "cc": 20 + i, "color": "white"}))
            .collect();
        Self {
            device: Some(Value::from(kind.as_str())),
            buttons,
            ..Default::default()
        }
    }

    /// Load configuration from a JSON or YAML file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(path, &contents)
    }

    /// Parse file contents, choosing the format from the file extension
    pub fn parse(path: &str, contents: &str) -> Result<Self> {
        let is_json = Path::new(path)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str(contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            serde_yaml::from_str(contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path))
        }
    }

    /// Load a config file, falling back to the built-in default on any error
    pub async fn load_or_default(path: &str) -> Self {
        match Self::load(path).await {
            Ok(cfg) => {
                info!("Loaded config from {} ({} button records)", path, cfg.buttons.len());
                cfg
            }
            Err(e) => {
                warn!("Config load error: {:#}, using defaults", e);
                Self::default_for(DeviceKind::default())
            }
        }
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let text = if path.to_ascii_lowercase().ends_with(".json") {
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?
        } else {
            serde_yaml::to_string(self).context("Failed to serialize config to YAML")?
        };

        fs::write(path, text)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    pub fn device_kind(&self) -> DeviceKind {
        match &self.device {
            None | Some(Value::Null) => DeviceKind::default(),
            Some(Value::String(s)) => DeviceKind::from_name(s).unwrap_or_else(|| {
                warn!("Unknown device '{}', assuming std10", s);
                DeviceKind::default()
            }),
            Some(other) => {
                warn!("Invalid device value {}, assuming std10", other);
                DeviceKind::default()
            }
        }
    }

    pub fn global_channel(&self) -> Option<u8> {
        match &self.channel {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_i64() {
                Some(ch) => Some(ch.clamp(0, 15) as u8),
                None => {
                    warn!("Invalid global channel {}, ignoring", value);
                    None
                }
            },
        }
    }

    /// Validate every section and produce the runtime-ready config
    ///
    /// The button list is padded with empty records or truncated to the
    /// device's switch count.
    pub fn resolve(&self) -> ResolvedConfig {
        let device = self.device_kind();
        let global_channel = self.global_channel();
        let count = device.button_count();

        if self.buttons.len() > count {
            warn!(
                "Config has {} buttons but {} supports {}, ignoring the rest",
                self.buttons.len(),
                device.as_str(),
                count
            );
        }

        let mut records: Vec<Value> = self.buttons.iter().take(count).cloned().collect();
        records.resize(count, Value::Null);
        let buttons = resolve_all(&records, global_channel);

        let encoder_section = self.encoder.as_ref().filter(|v| !v.is_null());
        let expression_section = self.expression.as_ref().filter(|v| !v.is_null());

        let (encoder, encoder_push) = if device.has_encoder() {
            let mut encoder = input::encoder_from_raw(encoder_section);
            encoder.channel = encoder.channel.or(global_channel);
            let push = resolve_encoder_push(
                encoder_section.and_then(|e| e.get("push")),
                count,
                global_channel,
            );
            (Some(encoder).filter(|e| e.enabled), push)
        } else {
            if encoder_section.is_some() {
                warn!("{} has no encoder, ignoring encoder config", device.as_str());
            }
            (None, None)
        };

        let expression = if device.has_expression() {
            (0..2)
                .map(|i| {
                    let key = format!("exp{}", i + 1);
                    let mut pedal = ExpressionConfig::from_raw(expression_section.and_then(|e| e.get(&key)), i);
                    pedal.channel = pedal.channel.or(global_channel);
                    pedal
                })
                .filter(|e| e.enabled)
                .collect()
        } else {
            if expression_section.is_some() {
                warn!("{} has no expression inputs, ignoring expression config", device.as_str());
            }
            Vec::new()
        };

        ResolvedConfig {
            device,
            buttons,
            encoder,
            encoder_push,
            expression,
        }
    }
}

/// The encoder push resolves like any button, with its own defaults
fn resolve_encoder_push(raw: Option<&Value>, index: usize, global_channel: Option<u8>) -> Option<ButtonConfig> {
    let mut record = Map::new();
    record.insert("label".into(), "PUSH".into());
    record.insert("cc".into(), 14.into());
    record.insert("mode".into(), "momentary".into());

    if let Some(Value::Object(obj)) = raw {
        if obj.get("enabled").and_then(Value::as_bool) == Some(false) {
            return None;
        }
        for (k, v) in obj {
            if k != "enabled" {
                record.insert(k.clone(), v.clone());
            }
        }
    }

    Some(resolve(&Value::Object(record), index, global_channel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_resolves_to_cc_buttons() {
        let cfg = DeviceConfig::default_for(DeviceKind::Mini6).resolve();

        assert_eq!(cfg.device, DeviceKind::Mini6);
        assert_eq!(cfg.buttons.len(), 6);
        assert_eq!(cfg.buttons[5].label, "6");
        assert_eq!(cfg.buttons[5].message, MessageConfig::Cc { cc: 25, cc_on: 127, cc_off: 0 });
        assert!(cfg.encoder.is_none());
        assert!(cfg.encoder_push.is_none());
        assert!(cfg.expression.is_empty());
    }

    #[test]
    fn test_buttons_padded_and_truncated() {
        let short = DeviceConfig {
            buttons: vec![json!({"label": "A"})],
            ..Default::default()
        }
        .resolve();
        assert_eq!(short.buttons.len(), 10);
        assert_eq!(short.buttons[0].label, "A");
        assert_eq!(short.buttons[9].label, "10");

        let long = DeviceConfig {
            device: Some(json!("mini6")),
            buttons: vec![json!({}); 9],
            ..Default::default()
        }
        .resolve();
        assert_eq!(long.buttons.len(), 6);
    }

    #[test]
    fn test_global_channel_applies() {
        let cfg = DeviceConfig {
            channel: Some(json!(4)),
            buttons: vec![json!({}), json!({"channel": 1})],
            ..Default::default()
        }
        .resolve();

        assert_eq!(cfg.buttons[0].channel, 4);
        assert_eq!(cfg.buttons[1].channel, 1);
        assert_eq!(cfg.encoder_push.as_ref().map(|b| b.channel), Some(4));
    }

    #[test]
    fn test_encoder_push_defaults_and_disable() {
        let cfg = DeviceConfig::default().resolve();
        let push = cfg.encoder_push.expect("push enabled by default");
        assert_eq!(push.label, "PUSH");
        assert_eq!(push.mode, ButtonMode::Momentary);
        assert_eq!(push.message, MessageConfig::Cc { cc: 14, cc_on: 127, cc_off: 0 });

        let disabled = DeviceConfig {
            encoder: Some(json!({"push": {"enabled": false}})),
            ..Default::default()
        }
        .resolve();
        assert!(disabled.encoder_push.is_none());
        assert!(disabled.encoder.is_some());
    }

    #[test]
    fn test_expression_disabled_pedal_dropped() {
        let cfg = DeviceConfig {
            expression: Some(json!({"exp2": {"enabled": false}})),
            ..Default::default()
        }
        .resolve();

        assert_eq!(cfg.expression.len(), 1);
        assert_eq!(cfg.expression[0].cc, 12);
    }

    #[test]
    fn test_unknown_device_falls_back() {
        let cfg = DeviceConfig {
            device: Some(json!("nano4")),
            ..Default::default()
        };
        assert_eq!(cfg.device_kind(), DeviceKind::Std10);
    }

    #[tokio::test]
    async fn test_load_json_and_yaml() -> Result<()> {
        let dir = TempDir::new()?;

        let json_path = dir.path().join("config.json");
        std::fs::write(
            &json_path,
            r#"{"device": "mini6", "buttons": [{"label": "TSC", "cc": 20, "color": "green"}]}"#,
        )?;
        let cfg = DeviceConfig::load(&json_path.to_string_lossy()).await?;
        assert_eq!(cfg.device_kind(), DeviceKind::Mini6);
        assert_eq!(cfg.resolve().buttons[0].label, "TSC");

        let yaml_path = dir.path().join("config.yaml");
        std::fs::write(
            &yaml_path,
            "channel: 2\nbuttons:\n  - label: BOOM\n    type: pc\n    program: 7\n",
        )?;
        let cfg = DeviceConfig::load(&yaml_path.to_string_lossy()).await?.resolve();
        assert_eq!(cfg.buttons[0].message, MessageConfig::ProgramChange { program: 7 });
        assert_eq!(cfg.buttons[0].channel, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_or_broken_file_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let missing = dir.path().join("nope.json");
        let cfg = DeviceConfig::load_or_default(&missing.to_string_lossy()).await;
        assert_eq!(cfg.buttons.len(), 10);

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json")?;
        let cfg = DeviceConfig::load_or_default(&broken.to_string_lossy()).await;
        assert_eq!(cfg.resolve().buttons[0].message, MessageConfig::Cc { cc: 20, cc_on: 127, cc_off: 0 });

        Ok(())
    }

    #[tokio::test]
    async fn test_save_then_load() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("saved.json");
        let path = path.to_string_lossy().to_string();

        let saved = DeviceConfig::default_for(DeviceKind::Std10);
        saved.save(&path).await?;
        let loaded = DeviceConfig::load(&path).await?;

        assert_eq!(loaded.resolve(), saved.resolve());
        Ok(())
    }
}
