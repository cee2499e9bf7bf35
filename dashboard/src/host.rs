use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::Mutex,
};
use tracing::{debug, info, warn};

use farmbot_common::{
    apply_effects, bot_reducer, fbos_details::BETA_OPT_IN, source_fbos_config, Action, BotState,
    CompatibilityConfig, Effect, FbosDetailsView, MemoryPreferences, RuntimeConfig,
};

const MAX_ACTION_BYTES: usize = 64 * 1024;

/// Single writer for the bot state. Every change goes through `dispatch`.
#[derive(Clone)]
struct Store {
    state: Arc<Mutex<BotState>>,
    compatibility: CompatibilityConfig,
}

#[derive(Clone)]
struct AppState {
    store: Store,
    preferences: Arc<Mutex<MemoryPreferences>>,
    fbos_config: Arc<BTreeMap<String, bool>>,
    app_store: AppStore,
}

#[derive(Clone)]
struct AppStore {
    runtime_path: Arc<PathBuf>,
    preferences_path: Arc<PathBuf>,
    fbos_config_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

enum InputLine {
    Line(Vec<u8>),
    Oversized,
    Eof,
}

#[derive(Debug, Serialize)]
struct Snapshot<'a> {
    action: &'a str,
    state: &'a BotState,
    details: FbosDetailsView,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let app_store = AppStore::new();
    let mut runtime = app_store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    if let Ok(device_id) = std::env::var("FARMBOT_DEVICE_ID") {
        runtime.device_id = Some(device_id);
    }
    runtime.sanitize();

    let preferences = app_store.load_preferences().await.unwrap_or_else(|err| {
        warn!("failed to load preferences from store: {err:#}");
        MemoryPreferences::default()
    });
    let fbos_config = app_store.load_fbos_config().await.unwrap_or_else(|err| {
        warn!("failed to load os config from store: {err:#}");
        BTreeMap::new()
    });

    let state = BotState::initial(&preferences, &runtime);
    let app_state = AppState {
        store: Store::new(state, runtime.compatibility),
        preferences: Arc::new(Mutex::new(preferences)),
        fbos_config: Arc::new(fbos_config),
        app_store,
    };

    info!(
        "dashboard ready for {}",
        runtime.device_id.as_deref().unwrap_or("unnamed device")
    );

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let emitted = process_input(&app_state, &mut stdin, &mut stdout).await?;

    info!("stdin closed after {emitted} snapshots, shutting down");
    Ok(())
}

/// Applies every action line from `reader`, writing one snapshot line per applied
/// action. Bad lines are logged and skipped; only I/O failures end the loop.
async fn process_input<R, W>(
    app_state: &AppState,
    reader: &mut R,
    writer: &mut W,
) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut emitted = 0;

    loop {
        let line = match read_input_line(reader)
            .await
            .context("failed to read action from stdin")?
        {
            InputLine::Line(line) => line,
            InputLine::Oversized => {
                warn!("dropping oversized action (over {MAX_ACTION_BYTES} bytes)");
                continue;
            }
            InputLine::Eof => break,
        };

        match handle_line(app_state, &line).await {
            Ok(Some(snapshot)) => {
                writer.write_all(&snapshot).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
                emitted += 1;
            }
            Ok(None) => {}
            Err(err) => warn!("action handling error: {err:#}"),
        }
    }

    Ok(emitted)
}

/// Reads one newline-terminated line, never buffering more than
/// `MAX_ACTION_BYTES + 1` bytes. The rest of an oversized line is discarded.
async fn read_input_line<R>(reader: &mut R) -> std::io::Result<InputLine>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_ACTION_BYTES as u64 + 1;
    let mut buf = Vec::new();

    let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
    if read == 0 {
        return Ok(InputLine::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(InputLine::Line(buf));
    }
    if buf.len() <= MAX_ACTION_BYTES {
        // Final line without a trailing newline.
        return Ok(InputLine::Line(buf));
    }

    loop {
        buf.clear();
        let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
        if read == 0 || buf.last() == Some(&b'\n') {
            return Ok(InputLine::Oversized);
        }
    }
}

impl Store {
    fn new(state: BotState, compatibility: CompatibilityConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            compatibility,
        }
    }

    async fn dispatch(&self, action: &Action) -> Vec<Effect> {
        let mut state = self.state.lock().await;
        let (next, effects) = bot_reducer(&state, action, &self.compatibility);
        *state = next;
        effects
    }

    async fn snapshot(&self) -> BotState {
        self.state.lock().await.clone()
    }
}

/// Decodes one line of input. Blank lines yield `None`.
fn decode_line(line: &str) -> anyhow::Result<Option<Action>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let action = Action::from_json(trimmed).context("failed to decode action")?;
    Ok(Some(action))
}

async fn handle_line(app_state: &AppState, line: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
    let message = std::str::from_utf8(line).context("non utf8 action")?;
    let Some(action) = decode_line(message)? else {
        return Ok(None);
    };

    if let Action::Unknown(kind) = &action {
        debug!("no reducer case for {kind}, state unchanged");
    }

    let effects = app_state.store.dispatch(&action).await;
    execute_effects(app_state, &effects).await?;

    let state = app_state.store.snapshot().await;
    let beta_opt_in = source_fbos_config(
        &app_state.fbos_config,
        &state.hardware.configuration,
        BETA_OPT_IN,
    );
    let snapshot = Snapshot {
        action: action.kind(),
        details: FbosDetailsView::new(&state.hardware.informational_settings, beta_opt_in),
        state: &state,
    };

    Ok(Some(serde_json::to_vec(&snapshot)?))
}

async fn execute_effects(app_state: &AppState, effects: &[Effect]) -> anyhow::Result<()> {
    for effect in effects {
        if let Effect::CompatibilityChecked(report) = effect {
            let version = report.controller_version.as_deref().unwrap_or("unknown");
            if report.compatible {
                debug!("controller version {version} is supported");
            } else {
                let expected = app_state.store.compatibility;
                warn!(
                    "controller version {version} is older than {}.{}; please upgrade FarmBot OS",
                    expected.expected_major, expected.expected_minor
                );
            }
        }
    }

    let preferences = {
        let mut preferences = app_state.preferences.lock().await;
        if apply_effects(effects, &mut *preferences) == 0 {
            return Ok(());
        }
        preferences.clone()
    };
    app_state.app_store.save_preferences(&preferences).await
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("FARMBOT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.farmbot"));
        Self::in_dir(data_dir)
    }

    fn in_dir(data_dir: PathBuf) -> Self {
        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
            preferences_path: Arc::new(data_dir.join("preferences.json")),
            fbos_config_path: Arc::new(data_dir.join("fbos_config.json")),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load_json<T: DeserializeOwned + Default>(&self, path: &Path) -> anyhow::Result<T> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(path).await {
            Ok(raw) => serde_json::from_slice::<T>(&raw)
                .with_context(|| format!("failed to parse {}", path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        self.load_json(&self.runtime_path).await
    }

    async fn load_preferences(&self) -> anyhow::Result<MemoryPreferences> {
        self.load_json(&self.preferences_path).await
    }

    async fn load_fbos_config(&self) -> anyhow::Result<BTreeMap<String, bool>> {
        self.load_json(&self.fbos_config_path).await
    }

    async fn save_preferences(&self, preferences: &MemoryPreferences) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.preferences_path.as_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(preferences)?;
        tokio::fs::write(path, payload)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmbot_common::{PreferenceStore, Xyz};
    use pretty_assertions::assert_eq;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("farmbot-dashboard-{}-{name}", std::process::id()))
    }

    fn app_state(dir: PathBuf) -> AppState {
        let preferences = MemoryPreferences::default();
        let state = BotState::initial(&preferences, &RuntimeConfig::default());
        AppState {
            store: Store::new(state, CompatibilityConfig::default()),
            preferences: Arc::new(Mutex::new(preferences)),
            fbos_config: Arc::new(BTreeMap::new()),
            app_store: AppStore::in_dir(dir),
        }
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(decode_line("   ").unwrap().is_none());
        assert!(decode_line("{not json").is_err());
        assert_eq!(
            decode_line(r#"{"type": "SET_MQTT_STATUS", "payload": true}"#).unwrap(),
            Some(Action::SetMqttStatus(true))
        );
    }

    #[tokio::test]
    async fn invalid_utf8_lines_are_skipped() {
        let app = app_state(scratch_dir("utf8"));
        let input: &[u8] = b"{\"type\": \"SET_MQTT_STATUS\", \"payload\": true}\n\
            \xff\xfe\n\
            {\"type\": \"CHANGE_STEP_SIZE\", \"payload\": 10}\n";
        let mut reader = input;
        let mut output = Vec::new();

        let emitted = process_input(&app, &mut reader, &mut output).await.unwrap();

        assert_eq!(emitted, 2);
        assert_eq!(output.iter().filter(|&&b| b == b'\n').count(), 2);
        let state = app.store.snapshot().await;
        assert!(state.connected_to_mqtt);
        assert_eq!(state.step_size, 10.0);
    }

    #[tokio::test]
    async fn oversized_lines_are_dropped_without_ending_input() {
        let app = app_state(scratch_dir("oversized"));
        let mut input = format!(
            r#"{{"type": "FETCH_OS_UPDATE_INFO_OK", "payload": "{}"}}"#,
            "9".repeat(MAX_ACTION_BYTES * 2)
        )
        .into_bytes();
        input.extend_from_slice(b"\n{\"type\": \"CHANGE_STEP_SIZE\", \"payload\": 1}\n");
        let mut reader = input.as_slice();
        let mut output = Vec::new();

        let emitted = process_input(&app, &mut reader, &mut output).await.unwrap();

        assert_eq!(emitted, 1);
        let snapshot: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(snapshot["action"], "CHANGE_STEP_SIZE");
        assert_eq!(app.store.snapshot().await.step_size, 1.0);
    }

    #[tokio::test]
    async fn final_line_without_newline_is_applied() {
        let app = app_state(scratch_dir("trailing"));
        let mut reader: &[u8] = b"\n\n{\"type\": \"CHANGE_STEP_SIZE\", \"payload\": 1}";
        let mut output = Vec::new();

        let emitted = process_input(&app, &mut reader, &mut output).await.unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(app.store.snapshot().await.step_size, 1.0);
    }

    #[tokio::test]
    async fn dispatch_applies_actions_in_order() {
        let store = Store::new(
            BotState::initial(&MemoryPreferences::default(), &RuntimeConfig::default()),
            CompatibilityConfig::default(),
        );

        store.dispatch(&Action::ChangeStepSize(10.0)).await;
        store.dispatch(&Action::ChangeStepSize(1.0)).await;

        assert_eq!(store.snapshot().await.step_size, 1.0);
    }

    #[tokio::test]
    async fn jog_inversion_is_persisted() {
        let dir = scratch_dir("inversion");
        let app = app_state(dir.clone());

        let snapshot = handle_line(&app, br#"{"type": "INVERT_JOG_BUTTON", "payload": "x"}"#)
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&snapshot).unwrap();

        assert_eq!(value["action"], "INVERT_JOG_BUTTON");
        assert_eq!(value["state"]["axis_inversion"]["x"], true);
        assert_eq!(
            app.preferences.lock().await.get_bool("x_axis_inverted"),
            Some(true)
        );

        let reloaded = AppStore::in_dir(dir.clone()).load_preferences().await.unwrap();
        let rebooted = BotState::initial(&reloaded, &RuntimeConfig::default());
        assert!(rebooted.axis_inversion.get(Xyz::X));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn bot_change_snapshot_includes_details() {
        let app = app_state(scratch_dir("details"));
        let line = r#"{"type": "BOT_CHANGE", "payload": {
            "location_data": {},
            "informational_settings": {
                "controller_version": "4.0.0", "soc_temp": 80, "wifi_level": -50
            }
        }}"#
        .replace('\n', " ");

        let snapshot = handle_line(&app, line.as_bytes()).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&snapshot).unwrap();

        assert_eq!(value["details"]["chip_temperature"]["color"], "red");
        assert_eq!(value["details"]["wifi_strength"]["percent"], 80);
        assert_eq!(
            value["state"]["hardware"]["informational_settings"]["controller_version"],
            "4.0.0"
        );
    }

    #[tokio::test]
    async fn unknown_actions_still_snapshot() {
        let app = app_state(scratch_dir("unknown"));
        let before = app.store.snapshot().await;

        let snapshot = handle_line(&app, br#"{"type": "RESOURCE_READY", "payload": []}"#)
            .await
            .unwrap();

        assert!(snapshot.is_some());
        assert_eq!(app.store.snapshot().await, before);
    }

    #[tokio::test]
    async fn missing_store_files_fall_back_to_defaults() {
        let store = AppStore::in_dir(scratch_dir("missing"));

        let runtime = store.load_runtime_config().await.unwrap();
        assert_eq!(runtime.step_size, 100.0);
        assert!(store.load_preferences().await.unwrap().is_empty());
        assert!(store.load_fbos_config().await.unwrap().is_empty());
    }
}
