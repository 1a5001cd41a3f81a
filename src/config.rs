//! Settings file loading, defaults, and environment overrides.
//!
//! Settings live in a TOML file (by default `.autocommit.toml` at the
//! workspace root) and are re-read on every run, so edits take effect on the
//! next scheduled firing without restarting the daemon.

use std::env;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use toml_edit::{DocumentMut, Item, Table};
use tracing::debug;

use crate::error::ConfigError;

/// Settings file name looked up at the workspace root.
pub const SETTINGS_FILE_NAME: &str = ".autocommit.toml";

/// Environment variables checked (in order) for the API credential.
pub const API_KEY_ENV_VARS: [&str; 2] = ["AUTOCOMMIT_API_KEY", "GEMINI_API_KEY"];

pub const DEFAULT_MESSAGE: &str = "Updated";
pub const DEFAULT_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Capability flags for features that are switched off until ready.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    /// Whether the push step exists at all. Off by default.
    pub push: bool,
}

/// Effective settings for one run.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub push_enabled: bool,
    pub default_message: String,
    pub interval_secs: u64,
    pub min_interval_secs: u64,
    pub remote: String,
    pub endpoint: String,
    pub model: String,
    pub features: Features,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            push_enabled: false,
            default_message: DEFAULT_MESSAGE.to_string(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
            remote: DEFAULT_REMOTE.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            features: Features::default(),
        }
    }
}

impl Settings {
    /// The interval the scheduler actually uses, floored at `min_interval_secs`.
    pub fn effective_interval(&self) -> Duration {
        Duration::from_secs(clamp_interval(self.interval_secs, self.min_interval_secs))
    }

    /// Whether a run should attempt the push step.
    pub fn should_push(&self) -> bool {
        self.push_enabled && self.features.push
    }
}

// The API key must never reach logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("push_enabled", &self.push_enabled)
            .field("default_message", &self.default_message)
            .field("interval_secs", &self.interval_secs)
            .field("min_interval_secs", &self.min_interval_secs)
            .field("remote", &self.remote)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("features", &self.features)
            .finish()
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_some() { "<set>" } else { "<not set>" };
        writeln!(f, "api_key           = {}", key)?;
        writeln!(f, "push_enabled      = {}", self.push_enabled)?;
        writeln!(f, "default_message   = {:?}", self.default_message)?;
        writeln!(
            f,
            "interval_secs     = {} (effective {}s)",
            self.interval_secs,
            self.effective_interval().as_secs()
        )?;
        writeln!(f, "min_interval_secs = {}", self.min_interval_secs)?;
        writeln!(f, "remote            = {}", self.remote)?;
        writeln!(f, "endpoint          = {}", self.endpoint)?;
        writeln!(f, "model             = {}", self.model)?;
        write!(f, "features.push     = {}", self.features.push)
    }
}

/// Floor a requested interval at the configured minimum.
pub fn clamp_interval(requested_secs: u64, min_secs: u64) -> u64 {
    requested_secs.max(min_secs)
}

/// Source of settings, consulted at the start of every run.
pub trait SettingsSource: Send + Sync {
    fn load(&self) -> Result<Settings, ConfigError>;

    /// File the settings are read from, if any. Runs never stage it, since it
    /// may hold the API key.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Settings backed by a TOML file plus environment overrides.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Settings file at the root of a workspace.
    pub fn for_workspace(root: &Path) -> Self {
        Self::new(root.join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsSource for FileSettings {
    fn load(&self) -> Result<Settings, ConfigError> {
        let mut settings = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path).map_err(|source| {
                ConfigError::ReadFailed {
                    path: self.path.clone(),
                    source,
                }
            })?;
            parse_settings(&self.path, &content)?
        } else {
            debug!("No settings file at {}, using defaults", self.path.display());
            Settings::default()
        };

        apply_env_overrides(&mut settings);
        Ok(settings)
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Fixed settings, handy for tests and embedding.
#[derive(Debug, Clone)]
pub struct StaticSettings(pub Settings);

impl SettingsSource for StaticSettings {
    fn load(&self) -> Result<Settings, ConfigError> {
        Ok(self.0.clone())
    }
}

/// Parse a settings document. Missing keys keep their defaults.
pub fn parse_settings(path: &Path, content: &str) -> Result<Settings, ConfigError> {
    let doc = content
        .parse::<DocumentMut>()
        .map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let root = doc.as_table();
    let mut settings = Settings::default();

    if let Some(key) = get_str(root, "api_key", "api_key")? {
        let key = key.trim();
        if !key.is_empty() {
            settings.api_key = Some(key.to_string());
        }
    }
    if let Some(push) = get_bool(root, "push_enabled", "push_enabled")? {
        settings.push_enabled = push;
    }
    if let Some(message) = get_str(root, "default_message", "default_message")? {
        settings.default_message = message;
    }
    if let Some(secs) = get_u64(root, "interval_secs", "interval_secs")? {
        settings.interval_secs = secs;
    }
    if let Some(secs) = get_u64(root, "min_interval_secs", "min_interval_secs")? {
        if secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "min_interval_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        settings.min_interval_secs = secs;
    }
    if let Some(remote) = get_str(root, "remote", "remote")? {
        if remote.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "remote".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        settings.remote = remote;
    }

    if let Some(generation) = get_table(root, "generation")? {
        if let Some(endpoint) = get_str(generation, "endpoint", "generation.endpoint")? {
            settings.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(model) = get_str(generation, "model", "generation.model")? {
            settings.model = model;
        }
    }

    if let Some(features) = get_table(root, "features")?
        && let Some(push) = get_bool(features, "push", "features.push")?
    {
        settings.features.push = push;
    }

    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    for var in API_KEY_ENV_VARS {
        if let Ok(value) = env::var(var) {
            let value = value.trim();
            if !value.is_empty() {
                debug!("Using API key from {}", var);
                settings.api_key = Some(value.to_string());
                return;
            }
        }
    }
}

fn get_table<'a>(table: &'a Table, key: &str) -> Result<Option<&'a Table>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(Item::Table(t)) => Ok(Some(t)),
        Some(_) => Err(invalid(key, "expected a table")),
    }
}

fn get_str(table: &Table, key: &str, name: &str) -> Result<Option<String>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(item) => item
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| invalid(name, "expected a string")),
    }
}

fn get_bool(table: &Table, key: &str, name: &str) -> Result<Option<bool>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(item) => item
            .as_bool()
            .map(Some)
            .ok_or_else(|| invalid(name, "expected true or false")),
    }
}

fn get_u64(table: &Table, key: &str, name: &str) -> Result<Option<u64>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(item) => {
            let value = item
                .as_integer()
                .ok_or_else(|| invalid(name, "expected an integer"))?;
            u64::try_from(value)
                .map(Some)
                .map_err(|_| invalid(name, "must not be negative"))
        }
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// The commented document written when no settings file exists yet.
pub fn default_settings_document() -> String {
    format!(
        r#"# autocommit settings. Re-read before every run.

# Gemini API key. Leave empty to use AUTOCOMMIT_API_KEY or GEMINI_API_KEY.
api_key = ""

# Commit message used when generation is unavailable or fails.
default_message = "{DEFAULT_MESSAGE}"

# Seconds between scheduled runs, floored at min_interval_secs.
interval_secs = {DEFAULT_INTERVAL_SECS}
min_interval_secs = {DEFAULT_MIN_INTERVAL_SECS}

# Push after committing (only when features.push is on).
push_enabled = false
remote = "{DEFAULT_REMOTE}"

[generation]
endpoint = "{DEFAULT_ENDPOINT}"
model = "{DEFAULT_MODEL}"

[features]
push = false
"#
    )
}

/// Create the settings file with defaults if it does not exist.
///
/// Returns `true` when a new file was written. The write goes through a
/// temp file in the same directory so a crash never leaves a partial file.
pub fn ensure_settings_file(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }

    let write_failed = |reason: String| ConfigError::WriteFailed {
        path: path.to_path_buf(),
        reason,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| write_failed(e.to_string()))?;
    tmp.write_all(default_settings_document().as_bytes())
        .map_err(|e| write_failed(e.to_string()))?;
    tmp.persist(path).map_err(|e| write_failed(e.error.to_string()))?;

    Ok(true)
}

/// Open the settings file for editing, creating it first if needed.
///
/// Uses `$VISUAL` or `$EDITOR` when set (waiting for the editor to exit),
/// otherwise the platform's default handler.
pub fn open_settings(path: &Path) -> Result<(), ConfigError> {
    ensure_settings_file(path)?;

    let open_failed = |reason: String| ConfigError::OpenFailed {
        path: path.to_path_buf(),
        reason,
    };

    let editor = ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|v| !v.trim().is_empty());

    match editor {
        Some(editor) => {
            let mut parts = editor.split_whitespace();
            let program = parts
                .next()
                .ok_or_else(|| open_failed("editor command is empty".to_string()))?;
            let status = Command::new(program)
                .args(parts)
                .arg(path)
                .status()
                .map_err(|e| open_failed(format!("could not start {}: {}", program, e)))?;
            if !status.success() {
                return Err(open_failed(format!("{} exited with {}", program, status)));
            }
            Ok(())
        }
        None => open::that(path).map_err(|e| open_failed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn parse(content: &str) -> Result<Settings, ConfigError> {
        parse_settings(Path::new("test.toml"), content)
    }

    #[test]
    fn test_clamp_interval_below_floor_yields_floor() {
        assert_eq!(clamp_interval(5, 30), 30);
        assert_eq!(clamp_interval(0, 15), 15);
    }

    #[test]
    fn test_clamp_interval_above_floor_unchanged() {
        assert_eq!(clamp_interval(120, 30), 120);
        assert_eq!(clamp_interval(30, 30), 30);
    }

    #[test]
    fn test_effective_interval_uses_configured_floor() {
        let settings = parse("interval_secs = 10\nmin_interval_secs = 15\n").unwrap();
        assert_eq!(settings.effective_interval(), Duration::from_secs(15));
    }

    #[test]
    fn test_parse_empty_document_gives_defaults() {
        assert_eq!(parse("").unwrap(), Settings::default());
    }

    #[test]
    fn test_parse_full_document() {
        let settings = parse(
            r#"
api_key = "abc123"
push_enabled = true
default_message = "chore: sync"
interval_secs = 90
min_interval_secs = 45
remote = "upstream"

[generation]
endpoint = "http://localhost:8080/v1beta/"
model = "gemini-1.5-flash"

[features]
push = true
"#,
        )
        .unwrap();

        assert_eq!(settings.api_key.as_deref(), Some("abc123"));
        assert!(settings.push_enabled);
        assert_eq!(settings.default_message, "chore: sync");
        assert_eq!(settings.interval_secs, 90);
        assert_eq!(settings.min_interval_secs, 45);
        assert_eq!(settings.remote, "upstream");
        assert_eq!(settings.endpoint, "http://localhost:8080/v1beta");
        assert_eq!(settings.model, "gemini-1.5-flash");
        assert!(settings.features.push);
        assert!(settings.should_push());
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let settings = parse("api_key = \"   \"\n").unwrap();
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_push_needs_capability_flag() {
        let settings = parse("push_enabled = true\n").unwrap();
        assert!(settings.push_enabled);
        assert!(!settings.should_push());
    }

    #[test]
    fn test_wrong_type_is_invalid_value() {
        let err = parse("interval_secs = \"fast\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "interval_secs"));
    }

    #[test]
    fn test_negative_interval_rejected() {
        let err = parse("interval_secs = -5\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_floor_rejected() {
        let err = parse("min_interval_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "min_interval_secs"));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = parse("interval_secs = = 3").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }

    #[test]
    fn test_default_document_round_trips_to_defaults() {
        let settings = parse(&default_settings_document()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let settings = Settings {
            api_key: Some("super-secret".to_string()),
            ..Settings::default()
        };
        let debug = format!("{:?}", settings);
        let display = settings.to_string();
        assert!(!debug.contains("super-secret"));
        assert!(!display.contains("super-secret"));
        assert!(display.contains("<set>"));
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars_unset(API_KEY_ENV_VARS, || {
            let settings = FileSettings::for_workspace(dir.path()).load().unwrap();
            assert_eq!(settings, Settings::default());
        });
    }

    #[test]
    #[serial]
    fn test_env_overrides_file_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "api_key = \"from-file\"\n").unwrap();

        temp_env::with_vars(
            [("AUTOCOMMIT_API_KEY", Some("from-env")), ("GEMINI_API_KEY", None)],
            || {
                let settings = FileSettings::new(&path).load().unwrap();
                assert_eq!(settings.api_key.as_deref(), Some("from-env"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_gemini_env_var_is_second_choice() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars(
            [("AUTOCOMMIT_API_KEY", Some("")), ("GEMINI_API_KEY", Some("gem"))],
            || {
                let settings = FileSettings::for_workspace(dir.path()).load().unwrap();
                assert_eq!(settings.api_key.as_deref(), Some("gem"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_settings_reread_on_every_load() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSettings::for_workspace(dir.path());

        temp_env::with_vars_unset(API_KEY_ENV_VARS, || {
            std::fs::write(source.path(), "interval_secs = 60\n").unwrap();
            assert_eq!(source.load().unwrap().interval_secs, 60);

            std::fs::write(source.path(), "interval_secs = 120\n").unwrap();
            assert_eq!(source.load().unwrap().interval_secs, 120);
        });
    }

    #[test]
    fn test_ensure_settings_file_creates_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);

        assert!(ensure_settings_file(&path).unwrap());
        std::fs::write(&path, "interval_secs = 99\n").unwrap();
        assert!(!ensure_settings_file(&path).unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "interval_secs = 99\n");
    }
}
