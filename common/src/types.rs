use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Xyz {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderDisplay {
    RawEncoders,
    ScaledEncoders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPanelOption {
    HomingAndCalibration,
    Motors,
    EncodersAndEndstops,
    DangerZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    SyncNow,
    Syncing,
    SyncError,
    Booting,
    Unknown,
    Maintenance,
}

/// Which collapsible sections of the device control panel are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPanelState {
    pub homing_and_calibration: bool,
    pub motors: bool,
    pub encoders_and_endstops: bool,
    pub danger_zone: bool,
}

impl ControlPanelState {
    pub fn get(&self, option: ControlPanelOption) -> bool {
        match option {
            ControlPanelOption::HomingAndCalibration => self.homing_and_calibration,
            ControlPanelOption::Motors => self.motors,
            ControlPanelOption::EncodersAndEndstops => self.encoders_and_endstops,
            ControlPanelOption::DangerZone => self.danger_zone,
        }
    }

    pub fn toggled(&self, option: ControlPanelOption) -> Self {
        let mut next = *self;
        let flag = match option {
            ControlPanelOption::HomingAndCalibration => &mut next.homing_and_calibration,
            ControlPanelOption::Motors => &mut next.motors,
            ControlPanelOption::EncodersAndEndstops => &mut next.encoders_and_endstops,
            ControlPanelOption::DangerZone => &mut next.danger_zone,
        };
        *flag = !*flag;
        next
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisInversion {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisInversion {
    pub fn get(&self, axis: Xyz) -> bool {
        match axis {
            Xyz::X => self.x,
            Xyz::Y => self.y,
            Xyz::Z => self.z,
        }
    }

    pub fn toggled(&self, axis: Xyz) -> Self {
        let mut next = *self;
        match axis {
            Xyz::X => next.x = !next.x,
            Xyz::Y => next.y = !next.y,
            Xyz::Z => next.z = !next.z,
        }
        next
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderVisibility {
    pub raw_encoders: bool,
    pub scaled_encoders: bool,
}

impl EncoderVisibility {
    pub fn get(&self, display: EncoderDisplay) -> bool {
        match display {
            EncoderDisplay::RawEncoders => self.raw_encoders,
            EncoderDisplay::ScaledEncoders => self.scaled_encoders,
        }
    }

    pub fn toggled(&self, display: EncoderDisplay) -> Self {
        let mut next = *self;
        match display {
            EncoderDisplay::RawEncoders => next.raw_encoders = !next.raw_encoders,
            EncoderDisplay::ScaledEncoders => next.scaled_encoders = !next.scaled_encoders,
        }
        next
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisCoordinates {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    #[serde(default)]
    pub position: AxisCoordinates,
    #[serde(default)]
    pub scaled_encoders: AxisCoordinates,
    #[serde(default)]
    pub raw_encoders: AxisCoordinates,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinState {
    pub mode: u8,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub status: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmwareManifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub executable: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    #[serde(default)]
    pub farmwares: BTreeMap<String, FarmwareManifest>,
}

/// A single free-form configuration value reported by the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

/// Informational block of the bot status tree. Everything past `controller_version`
/// is the OS diagnostics the device panel shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InformationalSettings {
    #[serde(default)]
    pub busy: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub sync_status: Option<SyncStatus>,
    #[serde(default)]
    pub controller_version: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub firmware_commit: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub soc_temp: Option<f64>,
    #[serde(default)]
    pub wifi_level: Option<f64>,
    #[serde(default)]
    pub uptime: Option<f64>,
    #[serde(default)]
    pub memory_usage: Option<f64>,
    #[serde(default)]
    pub disk_usage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareState {
    #[serde(default)]
    pub mcu_params: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub jobs: BTreeMap<String, JobProgress>,
    pub location_data: LocationData,
    #[serde(default)]
    pub pins: BTreeMap<String, PinState>,
    #[serde(default)]
    pub configuration: BTreeMap<String, ConfigValue>,
    pub informational_settings: InformationalSettings,
    #[serde(default)]
    pub user_env: BTreeMap<String, String>,
    #[serde(default)]
    pub process_info: ProcessInfo,
}

impl HardwareState {
    /// Parses a status tree as reported by the bot. `location_data` and
    /// `informational_settings` are required, the rest default to empty.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
