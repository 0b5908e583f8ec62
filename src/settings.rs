use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tauri::{AppHandle, Manager};

/// Available parsers for framing the incoming serial stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    ByteLength,
    Delimiter,
    Regex,
    Ready,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppSettings {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub store_selected_baud_rates: bool,

    // Serial line settings
    #[serde(default = "default_data_bits")]
    pub serialport_data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub serialport_stop_bits: u8,
    #[serde(default = "default_parity")]
    pub serialport_parity: String, // "none" | "even" | "odd"
    #[serde(default = "default_true")]
    pub serialport_lock: bool,
    #[serde(default)]
    pub serialport_rtscts: bool,
    #[serde(default)]
    pub serialport_xon: bool,
    #[serde(default)]
    pub serialport_xoff: bool,
    #[serde(default)]
    pub serialport_xany: bool,
    #[serde(default = "default_true")]
    pub serialport_hupcl: bool,

    // Parser settings
    #[serde(default = "default_parser")]
    pub selected_parser: ParserKind,
    #[serde(default = "default_parser_byte_length")]
    pub parser_byte_length: usize,
    #[serde(default = "default_parser_delimiter")]
    pub parser_delimiter: String,
    #[serde(default)]
    pub parser_include_delimiter: bool,
    #[serde(default = "default_parser_regex")]
    pub parser_regex: String,
    #[serde(default)]
    pub ready_parser_delimiter: String,
    #[serde(default)]
    pub force_byte_delimiter: bool,

    // Export settings
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

fn default_theme() -> String {
    "theme-saga-blue".to_string()
}
fn default_language() -> String {
    "de".to_string()
}
fn default_true() -> bool {
    true
}
fn default_data_bits() -> u8 {
    8
}
fn default_stop_bits() -> u8 {
    1
}
fn default_parity() -> String {
    "none".to_string()
}
fn default_parser() -> ParserKind {
    ParserKind::ByteLength
}
fn default_parser_byte_length() -> usize {
    1
}
fn default_parser_delimiter() -> String {
    "\\n".to_string()
}
fn default_parser_regex() -> String {
    "[\\n\\r]+".to_string()
}
fn default_export_dir() -> String {
    // Platform-specific documents directory
    dirs::document_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("MinTerm")
        .join("Exports")
        .to_string_lossy()
        .to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            language: default_language(),
            store_selected_baud_rates: default_true(),
            serialport_data_bits: default_data_bits(),
            serialport_stop_bits: default_stop_bits(),
            serialport_parity: default_parity(),
            serialport_lock: default_true(),
            serialport_rtscts: false,
            serialport_xon: false,
            serialport_xoff: false,
            serialport_xany: false,
            serialport_hupcl: default_true(),
            selected_parser: default_parser(),
            parser_byte_length: default_parser_byte_length(),
            parser_delimiter: default_parser_delimiter(),
            parser_include_delimiter: false,
            parser_regex: default_parser_regex(),
            ready_parser_delimiter: String::new(),
            force_byte_delimiter: false,
            export_dir: default_export_dir(),
        }
    }
}

fn get_settings_path(app: &AppHandle) -> Result<PathBuf, String> {
    let app_dir = app
        .path()
        .app_config_dir()
        .map_err(|e| format!("Failed to get app config dir: {}", e))?;

    std::fs::create_dir_all(&app_dir)
        .map_err(|e| format!("Failed to create app config dir: {}", e))?;

    Ok(app_dir.join("settings.json"))
}

#[tauri::command]
pub async fn load_settings(app: AppHandle) -> Result<AppSettings, String> {
    let settings_path = get_settings_path(&app)?;

    if settings_path.exists() {
        let content = std::fs::read_to_string(&settings_path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;

        serde_json::from_str(&content).map_err(|e| format!("Failed to parse settings: {}", e))
    } else {
        // First run: create default settings and directories
        let settings = AppSettings::default();
        initialize_directories(&settings)?;
        save_settings(app, settings.clone()).await?;
        Ok(settings)
    }
}

fn initialize_directories(settings: &AppSettings) -> Result<(), String> {
    let export_path = PathBuf::from(&settings.export_dir);
    std::fs::create_dir_all(&export_path)
        .map_err(|e| format!("Failed to create export directory: {}", e))?;

    Ok(())
}

#[tauri::command]
pub async fn save_settings(app: AppHandle, settings: AppSettings) -> Result<(), String> {
    let settings_path = get_settings_path(&app)?;

    // Ensure directories exist when saving
    initialize_directories(&settings)?;

    let content = serde_json::to_string_pretty(&settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    std::fs::write(&settings_path, content).map_err(|e| format!("Failed to write settings: {}", e))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DirectoryValidation {
    pub exists: bool,
    pub writable: bool,
    pub error: Option<String>,
}

#[tauri::command]
pub async fn validate_directory(path: String) -> Result<DirectoryValidation, String> {
    let dir_path = PathBuf::from(&path);

    // Check if directory exists
    let exists = dir_path.exists();

    // Check if writable
    let writable = if exists {
        // Try to create a temporary file to test writability
        let test_file = dir_path.join(".minterm_write_test");
        match std::fs::write(&test_file, b"test") {
            Ok(_) => {
                std::fs::remove_file(&test_file).ok();
                true
            }
            Err(_) => false,
        }
    } else {
        false
    };

    let error = if !exists {
        Some("Directory does not exist".to_string())
    } else if !writable {
        Some("Directory is not writable".to_string())
    } else {
        None
    };

    Ok(DirectoryValidation {
        exists,
        writable,
        error,
    })
}

#[tauri::command]
pub async fn create_directory(path: String) -> Result<(), String> {
    let dir_path = PathBuf::from(&path);
    std::fs::create_dir_all(&dir_path).map_err(|e| format!("Failed to create directory: {}", e))
}

#[tauri::command]
pub async fn get_app_version(app: AppHandle) -> Result<String, String> {
    Ok(app
        .config()
        .version
        .clone()
        .unwrap_or_else(|| "unknown".to_string()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub version: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    html_url: String,
}

fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
    let v = version.trim_start_matches('v');
    let parts: Vec<&str> = v.split('.').collect();
    if parts.len() >= 3 {
        let major = parts[0].parse().ok()?;
        let minor = parts[1].parse().ok()?;
        let patch = parts[2].parse().ok()?;
        Some((major, minor, patch))
    } else {
        None
    }
}

fn is_newer_version(current: &str, latest: &str) -> bool {
    match (parse_version(current), parse_version(latest)) {
        (Some((c_maj, c_min, c_pat)), Some((l_maj, l_min, l_pat))) => {
            (l_maj, l_min, l_pat) > (c_maj, c_min, c_pat)
        }
        _ => false,
    }
}

#[tauri::command]
pub async fn check_for_updates(app: AppHandle) -> Result<Option<UpdateInfo>, String> {
    let current_version = app
        .config()
        .version
        .clone()
        .unwrap_or_else(|| "0.0.0".to_string());

    let client = reqwest::Client::builder()
        .user_agent("MinTerm-App")
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

    let response = client
        .get("https://api.github.com/repos/minterm-app/minterm/releases/latest")
        .send()
        .await
        .map_err(|e| format!("Failed to fetch release info: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("GitHub API returned status: {}", response.status()));
    }

    let release: GitHubRelease = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse release info: {}", e))?;

    if is_newer_version(&current_version, &release.tag_name) {
        Ok(Some(UpdateInfo {
            version: release.tag_name,
            url: release.html_url,
        }))
    } else {
        Ok(None)
    }
}
