use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{EncoderDisplay, Xyz};

/// Step sizes offered by the jog controls.
pub const STEP_SIZES: [f64; 5] = [1.0, 10.0, 100.0, 1_000.0, 10_000.0];

/// Boolean preferences persisted on the client between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanSetting {
    XAxisInverted,
    YAxisInverted,
    ZAxisInverted,
    RawEncoders,
    ScaledEncoders,
}

impl BooleanSetting {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::XAxisInverted => "x_axis_inverted",
            Self::YAxisInverted => "y_axis_inverted",
            Self::ZAxisInverted => "z_axis_inverted",
            Self::RawEncoders => "raw_encoders",
            Self::ScaledEncoders => "scaled_encoders",
        }
    }
}

/// Translate an axis to the preference that remembers its jog inversion.
pub fn inversion_setting(axis: Xyz) -> BooleanSetting {
    match axis {
        Xyz::X => BooleanSetting::XAxisInverted,
        Xyz::Y => BooleanSetting::YAxisInverted,
        Xyz::Z => BooleanSetting::ZAxisInverted,
    }
}

/// Translate an encoder display to the preference that remembers its visibility.
pub fn encoder_setting(display: EncoderDisplay) -> BooleanSetting {
    match display {
        EncoderDisplay::RawEncoders => BooleanSetting::RawEncoders,
        EncoderDisplay::ScaledEncoders => BooleanSetting::ScaledEncoders,
    }
}

/// Key-value store for boolean preferences.
pub trait PreferenceStore {
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_bool(&mut self, key: &str, value: bool);

    fn setting(&self, setting: BooleanSetting) -> bool {
        self.get_bool(setting.as_str()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryPreferences {
    values: BTreeMap<String, bool>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).copied()
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), value);
    }
}

/// OS version the client was built against. Older controllers get flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityConfig {
    pub expected_major: i64,
    pub expected_minor: i64,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            expected_major: 5,
            expected_minor: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub compatibility: CompatibilityConfig,
    pub step_size: f64,
    #[serde(default)]
    pub device_id: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            compatibility: CompatibilityConfig::default(),
            step_size: 100.0,
            device_id: None,
        }
    }
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        if !STEP_SIZES.contains(&self.step_size) {
            self.step_size = 100.0;
        }

        if let Some(device_id) = &self.device_id {
            if device_id.trim().is_empty() {
                self.device_id = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_axis_maps_to_its_own_setting() {
        let mapped: Vec<BooleanSetting> = [Xyz::X, Xyz::Y, Xyz::Z]
            .into_iter()
            .map(inversion_setting)
            .collect();

        assert_eq!(
            mapped,
            vec![
                BooleanSetting::XAxisInverted,
                BooleanSetting::YAxisInverted,
                BooleanSetting::ZAxisInverted,
            ]
        );
    }

    #[test]
    fn every_encoder_display_maps_to_its_own_setting() {
        assert_eq!(
            encoder_setting(EncoderDisplay::RawEncoders).as_str(),
            "raw_encoders"
        );
        assert_eq!(
            encoder_setting(EncoderDisplay::ScaledEncoders).as_str(),
            "scaled_encoders"
        );
    }

    #[test]
    fn missing_preference_reads_as_false() {
        let mut prefs = MemoryPreferences::new();
        assert!(!prefs.setting(BooleanSetting::RawEncoders));

        prefs.set_bool("raw_encoders", true);
        assert!(prefs.setting(BooleanSetting::RawEncoders));
        assert_eq!(prefs.get_bool("scaled_encoders"), None);
    }

    #[test]
    fn preferences_serialize_as_flat_map() {
        let mut prefs = MemoryPreferences::new();
        prefs.set_bool("y_axis_inverted", true);

        let raw = serde_json::to_string(&prefs).unwrap();
        assert_eq!(raw, r#"{"y_axis_inverted":true}"#);

        let back: MemoryPreferences = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, prefs);
    }

    #[test]
    fn sanitize_resets_unknown_step_size() {
        let mut runtime = RuntimeConfig {
            step_size: 42.0,
            device_id: Some("  ".to_string()),
            ..RuntimeConfig::default()
        };
        runtime.sanitize();

        assert_eq!(runtime.step_size, 100.0);
        assert_eq!(runtime.device_id, None);

        runtime.step_size = 1_000.0;
        runtime.sanitize();
        assert_eq!(runtime.step_size, 1_000.0);
    }
}
