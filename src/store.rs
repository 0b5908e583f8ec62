// src/store.rs
//
// Persistence for the UI state that survives a restart: the macro tree and
// the monitor/export choices. The state is cached in memory and written
// back atomically on every change.

use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tauri::{AppHandle, Emitter, Manager};

use crate::codec::ConversionKind;
use crate::macro_tree::MacroNode;

// ============================================================================
// Types
// ============================================================================

/// Monitor and export choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorPrefs {
    /// Encodings shown in the monitor and preselected for export
    pub encodings: Vec<ConversionKind>,
    pub delimiter: String,
    pub leading_zeros: bool,
    pub include_timestamp: bool,
    /// Last chosen baud rate, kept when the settings allow storing it
    pub selected_baud_rate: Option<u32>,
}

impl Default for MonitorPrefs {
    fn default() -> Self {
        MonitorPrefs {
            encodings: vec![ConversionKind::Ascii],
            delimiter: String::new(),
            leading_zeros: false,
            include_timestamp: false,
            selected_baud_rate: None,
        }
    }
}

/// Everything the UI persists outside the settings dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiState {
    pub macros: Vec<MacroNode>,
    pub monitor: MonitorPrefs,
}

/// In-memory copy of the persisted state.
static UI_STATE: Lazy<RwLock<UiState>> = Lazy::new(|| RwLock::new(UiState::default()));

/// Path of the state file, set once during app setup.
static STATE_PATH: OnceCell<PathBuf> = OnceCell::new();

// ============================================================================
// File Handling
// ============================================================================

fn load_from(path: &Path) -> Result<UiState, String> {
    if !path.exists() {
        return Ok(UiState::default());
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read UI state: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse UI state: {}", e))
}

fn save_to(path: &Path, state: &UiState) -> Result<(), String> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| format!("Failed to serialise UI state: {}", e))?;

    // Atomic write: write to temp file, then rename
    let temp_path = path.with_extension("json.tmp");

    fs::write(&temp_path, json).map_err(|e| format!("Failed to write UI state: {}", e))?;
    fs::rename(&temp_path, path).map_err(|e| format!("Failed to replace UI state: {}", e))
}

fn persist(state: &UiState) -> Result<(), String> {
    match STATE_PATH.get() {
        Some(path) => save_to(path, state),
        None => Ok(()), // Not initialised yet
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Load the persisted UI state into memory.
/// Call this once during app setup.
pub fn initialise(app: &AppHandle) -> Result<(), String> {
    let app_data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| format!("Failed to get app data dir: {}", e))?;

    fs::create_dir_all(&app_data_dir)
        .map_err(|e| format!("Failed to create app data dir: {}", e))?;

    let path = app_data_dir.join("ui-state.json");
    let state = load_from(&path)?;
    tlog!(
        "[store] Loaded UI state with {} top-level macro nodes",
        state.macros.len()
    );

    let _ = STATE_PATH.set(path);
    let mut guard = UI_STATE
        .write()
        .map_err(|e| format!("Failed to lock UI state: {}", e))?;
    *guard = state;
    Ok(())
}

/// The persisted macro tree.
pub fn macro_tree() -> Vec<MacroNode> {
    UI_STATE.read().map(|s| s.macros.clone()).unwrap_or_default()
}

/// Replace and persist the macro tree.
pub fn set_macro_tree(nodes: Vec<MacroNode>) -> Result<(), String> {
    let mut guard = UI_STATE
        .write()
        .map_err(|e| format!("Failed to lock UI state: {}", e))?;
    guard.macros = nodes;
    persist(&guard)
}

/// The persisted monitor/export choices.
pub fn monitor_prefs() -> MonitorPrefs {
    UI_STATE.read().map(|s| s.monitor.clone()).unwrap_or_default()
}

/// Replace and persist the monitor/export choices.
pub fn set_monitor_prefs(prefs: MonitorPrefs) -> Result<(), String> {
    let mut guard = UI_STATE
        .write()
        .map_err(|e| format!("Failed to lock UI state: {}", e))?;
    guard.monitor = prefs;
    persist(&guard)
}

// ============================================================================
// Tauri Commands
// ============================================================================

/// Load the monitor/export choices.
#[tauri::command]
pub fn load_monitor_prefs() -> MonitorPrefs {
    monitor_prefs()
}

/// Persist the monitor/export choices and notify all windows.
#[tauri::command]
pub fn save_monitor_prefs(app: AppHandle, prefs: MonitorPrefs) -> Result<(), String> {
    set_monitor_prefs(prefs)?;
    let _ = app.emit("ui-state:changed", "monitor");
    Ok(())
}
