use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::{
    config::{
        encoder_setting, inversion_setting, BooleanSetting, CompatibilityConfig, PreferenceStore,
        RuntimeConfig,
    },
    diagnostics::CompatibilityReport,
    types::{
        AxisInversion, ControlPanelOption, ControlPanelState, EncoderDisplay, EncoderVisibility,
        HardwareState, SyncStatus, Xyz,
    },
};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("malformed action: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Requested state transitions. On the wire each action is `{"type": .., "payload": ..}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SettingUpdateStart,
    SettingUpdateEnd,
    ChangeStepSize(f64),
    ToggleControlPanelOption(ControlPanelOption),
    FetchOsUpdateInfoOk(String),
    BotChange(HardwareState),
    FetchFwUpdateInfoOk(String),
    SetSyncStatus(SyncStatus),
    InvertJogButton(Xyz),
    DisplayEncoderData(EncoderDisplay),
    SetMqttStatus(bool),
    /// Any `type` this reducer has no case for.
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl Action {
    pub fn from_json(raw: &str) -> Result<Self, ActionError> {
        let raw: RawAction = serde_json::from_str(raw)?;
        Self::from_raw(raw)
    }

    pub fn from_value(value: Value) -> Result<Self, ActionError> {
        let raw: RawAction = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(RawAction { kind, payload }: RawAction) -> Result<Self, ActionError> {
        let action = match kind.as_str() {
            "SETTING_UPDATE_START" => Self::SettingUpdateStart,
            "SETTING_UPDATE_END" => Self::SettingUpdateEnd,
            "CHANGE_STEP_SIZE" => Self::ChangeStepSize(serde_json::from_value(payload)?),
            "TOGGLE_CONTROL_PANEL_OPTION" => {
                Self::ToggleControlPanelOption(serde_json::from_value(payload)?)
            }
            "FETCH_OS_UPDATE_INFO_OK" => {
                Self::FetchOsUpdateInfoOk(serde_json::from_value(payload)?)
            }
            "BOT_CHANGE" => Self::BotChange(serde_json::from_value(payload)?),
            "FETCH_FW_UPDATE_INFO_OK" => {
                Self::FetchFwUpdateInfoOk(serde_json::from_value(payload)?)
            }
            "SET_SYNC_STATUS" => Self::SetSyncStatus(serde_json::from_value(payload)?),
            "INVERT_JOG_BUTTON" => Self::InvertJogButton(serde_json::from_value(payload)?),
            "DISPLAY_ENCODER_DATA" => {
                Self::DisplayEncoderData(serde_json::from_value(payload)?)
            }
            "SET_MQTT_STATUS" => Self::SetMqttStatus(serde_json::from_value(payload)?),
            _ => Self::Unknown(kind),
        };
        Ok(action)
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::SettingUpdateStart => "SETTING_UPDATE_START",
            Self::SettingUpdateEnd => "SETTING_UPDATE_END",
            Self::ChangeStepSize(_) => "CHANGE_STEP_SIZE",
            Self::ToggleControlPanelOption(_) => "TOGGLE_CONTROL_PANEL_OPTION",
            Self::FetchOsUpdateInfoOk(_) => "FETCH_OS_UPDATE_INFO_OK",
            Self::BotChange(_) => "BOT_CHANGE",
            Self::FetchFwUpdateInfoOk(_) => "FETCH_FW_UPDATE_INFO_OK",
            Self::SetSyncStatus(_) => "SET_SYNC_STATUS",
            Self::InvertJogButton(_) => "INVERT_JOG_BUTTON",
            Self::DisplayEncoderData(_) => "DISPLAY_ENCODER_DATA",
            Self::SetMqttStatus(_) => "SET_MQTT_STATUS",
            Self::Unknown(kind) => kind,
        }
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind())?;
        match self {
            Self::SettingUpdateStart | Self::SettingUpdateEnd | Self::Unknown(_) => {}
            Self::ChangeStepSize(size) => map.serialize_entry("payload", size)?,
            Self::ToggleControlPanelOption(option) => map.serialize_entry("payload", option)?,
            Self::FetchOsUpdateInfoOk(version) | Self::FetchFwUpdateInfoOk(version) => {
                map.serialize_entry("payload", version)?
            }
            Self::BotChange(hardware) => map.serialize_entry("payload", hardware)?,
            Self::SetSyncStatus(status) => map.serialize_entry("payload", status)?,
            Self::InvertJogButton(axis) => map.serialize_entry("payload", axis)?,
            Self::DisplayEncoderData(display) => map.serialize_entry("payload", display)?,
            Self::SetMqttStatus(connected) => map.serialize_entry("payload", connected)?,
        }
        map.end()
    }
}

/// Work the host performs after a reduction. The reducer itself never touches the
/// preference store or reports anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Effect {
    PersistPreference {
        setting: BooleanSetting,
        value: bool,
    },
    CompatibilityChecked(CompatibilityReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotState {
    #[serde(rename = "connectedToMQTT")]
    pub connected_to_mqtt: bool,
    #[serde(rename = "stepSize")]
    pub step_size: f64,
    #[serde(rename = "controlPanelState")]
    pub control_panel_state: ControlPanelState,
    pub hardware: HardwareState,
    pub dirty: bool,
    #[serde(rename = "isUpdating")]
    pub is_updating: bool,
    #[serde(rename = "currentOSVersion")]
    pub current_os_version: Option<String>,
    #[serde(rename = "currentFWVersion")]
    pub current_fw_version: Option<String>,
    pub axis_inversion: AxisInversion,
    pub encoder_visibility: EncoderVisibility,
}

impl BotState {
    /// Boot state. Inversion and encoder flags come from the preference store;
    /// it is not read again afterwards.
    pub fn initial(prefs: &dyn PreferenceStore, runtime: &RuntimeConfig) -> Self {
        Self {
            connected_to_mqtt: false,
            step_size: runtime.step_size,
            control_panel_state: ControlPanelState::default(),
            hardware: HardwareState::default(),
            dirty: false,
            is_updating: false,
            current_os_version: None,
            current_fw_version: None,
            axis_inversion: AxisInversion {
                x: prefs.setting(inversion_setting(Xyz::X)),
                y: prefs.setting(inversion_setting(Xyz::Y)),
                z: prefs.setting(inversion_setting(Xyz::Z)),
            },
            encoder_visibility: EncoderVisibility {
                raw_encoders: prefs.setting(encoder_setting(EncoderDisplay::RawEncoders)),
                scaled_encoders: prefs.setting(encoder_setting(EncoderDisplay::ScaledEncoders)),
            },
        }
    }
}

pub fn bot_reducer(
    state: &BotState,
    action: &Action,
    compatibility: &CompatibilityConfig,
) -> (BotState, Vec<Effect>) {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match action {
        Action::SettingUpdateStart => next.is_updating = true,
        Action::SettingUpdateEnd => next.is_updating = false,
        Action::ChangeStepSize(size) => next.step_size = *size,
        Action::ToggleControlPanelOption(option) => {
            next.control_panel_state = state.control_panel_state.toggled(*option);
        }
        Action::FetchOsUpdateInfoOk(version) => next.current_os_version = Some(version.clone()),
        Action::BotChange(hardware) => {
            next.hardware = hardware.clone();
            effects.push(Effect::CompatibilityChecked(CompatibilityReport::check(
                hardware.informational_settings.controller_version.as_deref(),
                compatibility.expected_major,
                compatibility.expected_minor,
            )));
        }
        Action::FetchFwUpdateInfoOk(version) => next.current_fw_version = Some(version.clone()),
        Action::SetSyncStatus(status) => {
            next.hardware.informational_settings.sync_status = Some(*status);
        }
        Action::InvertJogButton(axis) => {
            next.axis_inversion = state.axis_inversion.toggled(*axis);
            effects.push(Effect::PersistPreference {
                setting: inversion_setting(*axis),
                value: next.axis_inversion.get(*axis),
            });
        }
        Action::DisplayEncoderData(display) => {
            next.encoder_visibility = state.encoder_visibility.toggled(*display);
            effects.push(Effect::PersistPreference {
                setting: encoder_setting(*display),
                value: next.encoder_visibility.get(*display),
            });
        }
        Action::SetMqttStatus(connected) => next.connected_to_mqtt = *connected,
        Action::Unknown(_) => {}
    }

    (next, effects)
}

/// Writes preference effects to the store; returns how many were written.
pub fn apply_effects(effects: &[Effect], prefs: &mut dyn PreferenceStore) -> usize {
    let mut written = 0;
    for effect in effects {
        if let Effect::PersistPreference { setting, value } = effect {
            prefs.set_bool(setting.as_str(), *value);
            written += 1;
        }
    }
    written
}
