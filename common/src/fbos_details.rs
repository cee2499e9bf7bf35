use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    diagnostics::{ChipTemperatureDisplay, WifiStrengthDisplay},
    types::{ConfigValue, InformationalSettings},
};

pub const BETA_OPT_IN: &str = "beta_opt_in";
const OS_SOURCE_TREE: &str = "https://github.com/FarmBot/farmbot_os/tree/";

pub fn shorten_commit(commit: Option<&str>) -> String {
    commit.unwrap_or("").chars().take(8).collect()
}

/// `farmbot@farmbot-000000.local` -> `farmbot-000000.local`
pub fn node_name_host(node_name: Option<&str>) -> String {
    node_name
        .unwrap_or("")
        .rsplit('@')
        .next()
        .unwrap_or("")
        .to_string()
}

/// A configuration value as the user set it, and whether the bot agrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceFbosConfig {
    pub value: bool,
    pub consistent: bool,
}

/// Looks `key` up in the locally desired config, falling back to what the bot
/// reports when the user never set it.
pub fn source_fbos_config(
    local: &BTreeMap<String, bool>,
    reported: &BTreeMap<String, ConfigValue>,
    key: &str,
) -> SourceFbosConfig {
    let bot_value = reported.get(key).and_then(ConfigValue::as_bool);
    match local.get(key) {
        Some(value) => SourceFbosConfig {
            value: *value,
            consistent: bot_value == Some(*value),
        },
        None => SourceFbosConfig {
            value: bot_value.unwrap_or(false),
            consistent: true,
        },
    }
}

/// Requested change to the OS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigUpdate {
    pub key: &'static str,
    pub value: bool,
}

/// Opting out always goes through. Opting in only when `confirm` agrees, since
/// beta releases may be unstable.
pub fn toggle_beta_opt_in(
    current: SourceFbosConfig,
    confirm: impl FnOnce() -> bool,
) -> Option<ConfigUpdate> {
    if current.value || confirm() {
        Some(ConfigUpdate {
            key: BETA_OPT_IN,
            value: !current.value,
        })
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleView {
    pub value: bool,
    pub dim: bool,
}

/// Everything the OS details panel shows, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FbosDetailsView {
    pub environment: String,
    pub commit: String,
    pub commit_link: String,
    pub target: String,
    pub node_name: String,
    pub firmware: String,
    pub firmware_commit: String,
    pub uptime: Option<String>,
    pub memory_usage: Option<String>,
    pub disk_usage: Option<String>,
    pub chip_temperature: ChipTemperatureDisplay,
    pub wifi_strength: WifiStrengthDisplay,
    pub beta_opt_in: ToggleView,
}

impl FbosDetailsView {
    pub fn new(info: &InformationalSettings, beta_opt_in: SourceFbosConfig) -> Self {
        let commit = shorten_commit(info.commit.as_deref());
        Self {
            environment: info.env.clone().unwrap_or_default(),
            commit_link: format!("{OS_SOURCE_TREE}{commit}"),
            commit,
            target: info.target.clone().unwrap_or_default(),
            node_name: node_name_host(info.node_name.as_deref()),
            firmware: info.firmware_version.clone().unwrap_or_default(),
            firmware_commit: shorten_commit(info.firmware_commit.as_deref()),
            uptime: info.uptime.map(|s| format!("{s}s")),
            memory_usage: info.memory_usage.map(|mb| format!("{mb}MB")),
            disk_usage: info.disk_usage.map(|pct| format!("{pct}%")),
            chip_temperature: ChipTemperatureDisplay::new(info.target.as_deref(), info.soc_temp),
            wifi_strength: WifiStrengthDisplay::new(info.wifi_level),
            beta_opt_in: ToggleView {
                value: beta_opt_in.value,
                dim: !beta_opt_in.consistent,
            },
        }
    }
}
