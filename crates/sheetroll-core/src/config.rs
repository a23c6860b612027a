//! Configuration files for sheetroll.
//!
//! # Configuration Types
//!
//! - **Config**: project settings from `sheetroll.toml`: which spreadsheet,
//!   which sheet and range, retry tuning, sample fallback
//! - **`CredentialsConfig`**: API key and optional OAuth access token from
//!   `~/.config/sheetroll/credentials.toml`
//!
//! # Resolution Algorithm
//!
//! Each file has its own lookup order, first hit wins:
//!
//! - `sheetroll.toml`: `SHEETROLL_CONFIG_PATH`, then the current directory
//!   and each of its parents up to the filesystem root.
//! - `credentials.toml`: `SHEETROLL_CREDENTIALS_PATH`, then the XDG config
//!   directory (`~/.config/sheetroll/`).
//!
//! # Example
//!
//! ```toml
//! spreadsheet_id = "1AbC..."
//! student_sheet = "Students"
//! data_range = "A1:Z1000"
//!
//! [retry]
//! max_retries = 3
//! initial_delay_ms = 1000
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Default Sheets API base URL.
pub const DEFAULT_ENDPOINT: &str = "https://sheets.googleapis.com/v4";

const PROJECT_FILE: &str = "sheetroll.toml";
const CREDENTIALS_FILE: &str = "credentials.toml";

/// A loaded configuration file of either kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConfigFile {
    /// Project configuration from `sheetroll.toml`.
    Project(Config),

    /// Credentials from `~/.config/sheetroll/credentials.toml`.
    Credentials(CredentialsConfig),
}

/// Configuration type discriminator for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Project,
    Credentials,
}

/// Errors that can occur during configuration resolution or loading.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error when reading a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error when a config file is malformed.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file not found.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A value is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigFile {
    /// Resolves a configuration file using the unified resolution algorithm.
    ///
    /// Missing files are not errors: `Ok(None)` means nothing was found.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read or parsed.
    pub fn resolve(kind: ConfigKind) -> Result<Option<Self>, ConfigError> {
        if let Some(path) = env_override(kind)
            && path.exists()
        {
            return load_config_from_path(&path, kind).map(Some);
        }

        let current = std::env::current_dir()?;
        for dir in current.ancestors() {
            if let Some(config) = check_directory(dir, kind)? {
                return Ok(Some(config));
            }
        }

        if let Some(path) = xdg_config_path(kind)
            && path.exists()
        {
            return load_config_from_path(&path, kind).map(Some);
        }

        Ok(None)
    }

    /// Loads a configuration file from an explicit path, inferring its kind
    /// from the file name.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if the file cannot be read or parsed, or
    /// if its name is not a known config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let kind = infer_kind_from_path(path)?;
        load_config_from_path(path, kind)
    }

    pub fn into_project(self) -> Option<Config> {
        match self {
            ConfigFile::Project(config) => Some(config),
            ConfigFile::Credentials(_) => None,
        }
    }

    pub fn into_credentials(self) -> Option<CredentialsConfig> {
        match self {
            ConfigFile::Credentials(config) => Some(config),
            ConfigFile::Project(_) => None,
        }
    }
}

/// Project configuration from `sheetroll.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Spreadsheet document id, taken from its URL.
    pub spreadsheet_id: String,

    /// Sheets API base URL.
    pub endpoint: String,

    /// Sheet holding the student roster and attendance columns.
    pub student_sheet: String,

    /// A1 range read for student data.
    pub data_range: String,

    /// Substitute built-in sample data when a read fails.
    pub use_sample_data_on_error: bool,

    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            student_sheet: "Students".to_string(),
            data_range: "A1:Z1000".to_string(),
            use_sample_data_on_error: true,
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Loads and parses a project config file from the given path.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file cannot be read and `Parse` if it is not
    /// valid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|_e| ConfigError::NotFound(path.to_path_buf()))?;

        Ok(toml::from_str(&contents)?)
    }

    /// Loads the project config via [`ConfigFile::resolve`].
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read or parsed.
    pub fn load_resolved() -> Result<Option<Self>, ConfigError> {
        Ok(ConfigFile::resolve(ConfigKind::Project)?.and_then(ConfigFile::into_project))
    }

    /// Checks the values a client cannot work without.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` when the spreadsheet id or endpoint is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::Invalid("spreadsheet_id is not set".to_string()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint is empty".to_string()));
        }
        Ok(())
    }
}

/// Rate-limit retry tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after a 429 on value reads. Writes are never retried.
    pub max_retries: usize,

    /// Delay before the first retry; doubled for each following one.
    pub initial_delay_ms: u64,

    /// Retries after a 429 on spreadsheet metadata lookups.
    pub metadata_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            metadata_retries: 2,
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

/// Credentials from `~/.config/sheetroll/credentials.toml`.
///
/// `Debug` never prints the secrets.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// API key used for reads and the unauthenticated append path.
    #[serde(default)]
    pub api_key: String,

    /// OAuth access token with the spreadsheets scope. Writes are only
    /// attempted for real when this is present.
    #[serde(default)]
    pub access_token: Option<String>,

    /// OAuth client id the token was issued to.
    #[serde(default)]
    pub client_id: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("api_key", &redacted(!self.api_key.is_empty()))
            .field("access_token", &redacted(self.access_token.is_some()))
            .field("client_id", &self.client_id)
            .finish()
    }
}

fn redacted(present: bool) -> &'static str {
    if present { "<redacted>" } else { "<unset>" }
}

impl CredentialsConfig {
    /// Loads credentials via [`ConfigFile::resolve`].
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read or parsed.
    pub fn load_resolved() -> Result<Option<Self>, ConfigError> {
        Ok(ConfigFile::resolve(ConfigKind::Credentials)?.and_then(ConfigFile::into_credentials))
    }
}

// ===== Resolution helpers =====

fn env_override(kind: ConfigKind) -> Option<PathBuf> {
    let var = match kind {
        ConfigKind::Project => "SHEETROLL_CONFIG_PATH",
        ConfigKind::Credentials => "SHEETROLL_CREDENTIALS_PATH",
    };
    std::env::var_os(var).map(PathBuf::from)
}

fn check_directory(dir: &Path, kind: ConfigKind) -> Result<Option<ConfigFile>, ConfigError> {
    let filename = match kind {
        ConfigKind::Project => PROJECT_FILE,
        ConfigKind::Credentials => return Ok(None),
    };

    let path = dir.join(filename);
    if path.exists() {
        load_config_from_path(&path, kind).map(Some)
    } else {
        Ok(None)
    }
}

fn xdg_config_path(kind: ConfigKind) -> Option<PathBuf> {
    let dir = dirs::config_dir()?.join("sheetroll");

    match kind {
        ConfigKind::Credentials => Some(dir.join(CREDENTIALS_FILE)),
        ConfigKind::Project => None,
    }
}

fn load_config_from_path(path: &Path, kind: ConfigKind) -> Result<ConfigFile, ConfigError> {
    let contents = fs::read_to_string(path)?;

    match kind {
        ConfigKind::Project => Ok(ConfigFile::Project(toml::from_str(&contents)?)),
        ConfigKind::Credentials => Ok(ConfigFile::Credentials(toml::from_str(&contents)?)),
    }
}

fn infer_kind_from_path(path: &Path) -> Result<ConfigKind, ConfigError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?;

    match file_name {
        PROJECT_FILE => Ok(ConfigKind::Project),
        CREDENTIALS_FILE => Ok(ConfigKind::Credentials),
        _ => Err(ConfigError::Invalid(format!(
            "Unknown config file type: {file_name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Mutex};

    use tempfile::TempDir;

    use super::*;

    // Tests below change the process-wide current directory.
    static CWD_LOCK: Mutex<()> = Mutex::new(());

    fn resolve_in(dir: &Path, kind: ConfigKind) -> Result<Option<ConfigFile>, ConfigError> {
        let _guard = CWD_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        let result = ConfigFile::resolve(kind);
        std::env::set_current_dir(original_dir).unwrap();
        result
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let config: Config = toml::from_str(r#"spreadsheet_id = "abc""#).unwrap();
        assert_eq!(config.spreadsheet_id, "abc");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.student_sheet, "Students");
        assert_eq!(config.data_range, "A1:Z1000");
        assert!(config.use_sample_data_on_error);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.retry.initial_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_retry_section_overrides() {
        let config: Config = toml::from_str(
            r#"spreadsheet_id = "abc"
use_sample_data_on_error = false

[retry]
max_retries = 5
initial_delay_ms = 10
"#,
        )
        .unwrap();
        assert!(!config.use_sample_data_on_error);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_delay_ms, 10);
        assert_eq!(config.retry.metadata_retries, 2);
    }

    #[test]
    fn test_resolve_project_config_from_current_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(PROJECT_FILE),
            r#"spreadsheet_id = "from-cwd""#,
        )
        .unwrap();

        let config = resolve_in(temp.path(), ConfigKind::Project)
            .unwrap()
            .and_then(ConfigFile::into_project)
            .unwrap();
        assert_eq!(config.spreadsheet_id, "from-cwd");
    }

    #[test]
    fn test_resolve_project_config_walks_up_directories() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("deeply/nested/dir");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            temp.path().join(PROJECT_FILE),
            r#"spreadsheet_id = "from-parent""#,
        )
        .unwrap();

        let config = resolve_in(&nested, ConfigKind::Project)
            .unwrap()
            .and_then(ConfigFile::into_project)
            .unwrap();
        assert_eq!(config.spreadsheet_id, "from-parent");
    }

    #[test]
    fn test_malformed_project_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(PROJECT_FILE), "spreadsheet_id = [").unwrap();

        let result = resolve_in(temp.path(), ConfigKind::Project);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_infers_kind_from_file_name() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CREDENTIALS_FILE);
        fs::write(
            &path,
            r#"api_key = "key"
access_token = "token"
"#,
        )
        .unwrap();

        let credentials = ConfigFile::load(&path).unwrap().into_credentials().unwrap();
        assert_eq!(credentials.api_key, "key");
        assert_eq!(credentials.access_token.as_deref(), Some("token"));
        assert!(credentials.client_id.is_none());

        let other = temp.path().join("other.toml");
        fs::write(&other, "").unwrap();
        assert!(matches!(
            ConfigFile::load(&other),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join(PROJECT_FILE);
        assert!(matches!(
            Config::load(&missing),
            Err(ConfigError::NotFound(p)) if p == missing
        ));
    }

    #[test]
    fn test_validate_requires_spreadsheet_id() {
        assert!(matches!(
            Config::default().validate(),
            Err(ConfigError::Invalid(_))
        ));
        let config = Config {
            spreadsheet_id: "abc".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let credentials = CredentialsConfig {
            api_key: "secret-key".to_string(),
            access_token: Some("secret-token".to_string()),
            client_id: None,
        };
        let printed = format!("{credentials:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }
}
