//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "ARMS_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "arms.db";

/// Bootstrap configuration loaded from TOML file
///
/// Every field has a built-in default, so a missing file or a partial file
/// is never an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and batch workspaces
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Result Ingest HTTP port
    #[serde(default)]
    pub ri_port: Option<u16>,

    /// Records Review HTTP port
    #[serde(default)]
    pub rr_port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    /// Largest accepted upload, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// External parsing gateway invocation
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Program to execute
    #[serde(default = "default_extraction_program")]
    pub program: String,

    /// Leading arguments (the script path); document and output flags follow
    #[serde(default = "default_extraction_args")]
    pub args: Vec<String>,

    /// Seconds before the parsing process is killed
    #[serde(default = "default_extraction_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            program: default_extraction_program(),
            args: default_extraction_args(),
            timeout_secs: default_extraction_timeout_secs(),
        }
    }
}

/// Record merge policy
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergeConfig {
    /// Abort a fresh upload that would add a second copy of a semester
    #[serde(default)]
    pub reject_duplicate_semesters: bool,

    #[serde(default)]
    pub reappear_credit_update: CreditUpdateMode,
}

/// How a reappear correction adjusts `totalCreditMarks` and `totalCredits`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditUpdateMode {
    /// Add the corrected subject's contribution on top of the stored sum
    #[default]
    Additive,
    /// Replace the old subject's contribution with the corrected one
    Differential,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_extraction_program() -> String {
    "python".to_string()
}

fn default_extraction_args() -> Vec<String> {
    vec!["src/Parser-Senpai/ParserSenpai.py".to_string()]
}

fn default_extraction_timeout_secs() -> u64 {
    120
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

/// Load TOML configuration from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Load TOML configuration from the platform config location
///
/// Falls back to defaults when no file exists.
pub fn load_default_toml_config() -> Result<TomlConfig> {
    match locate_config_file() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_toml_config(&path)
        }
        None => {
            debug!("No configuration file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    get_default_root_folder()
}

/// Get platform configuration file path, if one exists
fn locate_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("arms").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/arms/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("arms"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\arms"))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join("arms"))
            .unwrap_or_else(|| PathBuf::from("./arms_data"))
    }
}

/// Prepares the root folder layout
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root folder and its temp area if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.temp_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    /// Parent directory for per-batch workspaces
    pub fn temp_path(&self) -> PathBuf {
        self.root.join("tmp")
    }
}
