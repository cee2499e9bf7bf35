pub mod config;
pub mod diagnostics;
pub mod fbos_details;
pub mod reducer;
pub mod steps;
pub mod types;

pub use config::{
    encoder_setting, inversion_setting, BooleanSetting, CompatibilityConfig, MemoryPreferences,
    PreferenceStore, RuntimeConfig,
};
pub use diagnostics::{
    color_from_temp, version_ok, wifi_percent, ChipTemperatureDisplay, CompatibilityReport,
    TempColor, WifiStrengthDisplay,
};
pub use fbos_details::{source_fbos_config, FbosDetailsView, SourceFbosConfig};
pub use reducer::{apply_effects, bot_reducer, Action, ActionError, BotState, Effect};
pub use types::{
    ControlPanelOption, EncoderDisplay, HardwareState, InformationalSettings, SyncStatus, Xyz,
};
