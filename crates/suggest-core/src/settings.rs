//! Global settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::path::PathBuf;
use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bucketed: BucketedSettings,
    pub exact: ExactSettings,
    pub sort: SortSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketedSettings {
    pub buckets: usize,
    pub exact_first: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExactSettings {
    pub exact_first: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SortSettings {
    pub ram_buffer_mb: usize,
    pub max_temp_files: usize,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_range {
        ($section:ident . $field:ident, $range:expr, $reason:literal) => {
            if !$range.contains(&s.$section.$field) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: $reason.to_string(),
                });
            }
        };
    }

    check_range!(bucketed.buckets, 1..=255, "must be in 1..=255");
    check_range!(sort.ram_buffer_mb, 1..=2048, "must be in 1..=2048");
    check_range!(sort.max_temp_files, 2..=usize::MAX, "must be at least 2");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_toml() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(s.bucketed.buckets, 10);
        assert!(s.bucketed.exact_first);
        assert!(s.exact.exact_first);
        assert_eq!(s.sort.ram_buffer_mb, 32);
        assert_eq!(s.sort.max_temp_files, 128);
        assert!(s.sort.temp_dir.is_none());
    }

    #[test]
    fn parse_valid_custom_toml() {
        let toml = r#"
[bucketed]
buckets = 255
exact_first = false

[exact]
exact_first = false

[sort]
ram_buffer_mb = 4
max_temp_files = 8
temp_dir = "/var/tmp/suggest"
"#;
        let s = parse_settings_toml(toml).unwrap();
        assert_eq!(s.bucketed.buckets, 255);
        assert!(!s.bucketed.exact_first);
        assert_eq!(s.sort.max_temp_files, 8);
        assert_eq!(s.sort.temp_dir, Some(PathBuf::from("/var/tmp/suggest")));
    }

    #[test]
    fn error_zero_buckets() {
        let toml = r#"
[bucketed]
buckets = 0
exact_first = true

[exact]
exact_first = true

[sort]
ram_buffer_mb = 32
max_temp_files = 128
"#;
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(err.to_string().contains("bucketed.buckets"));
    }

    #[test]
    fn error_too_many_buckets() {
        let toml = r#"
[bucketed]
buckets = 256
exact_first = true

[exact]
exact_first = true

[sort]
ram_buffer_mb = 32
max_temp_files = 128
"#;
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(err.to_string().contains("bucketed.buckets"));
    }

    #[test]
    fn error_single_temp_file() {
        let toml = r#"
[bucketed]
buckets = 10
exact_first = true

[exact]
exact_first = true

[sort]
ram_buffer_mb = 32
max_temp_files = 1
"#;
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(err.to_string().contains("sort.max_temp_files"));
    }

    #[test]
    fn error_invalid_toml() {
        let err = parse_settings_toml("not valid toml {{{").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn error_missing_section() {
        let toml = r#"
[bucketed]
buckets = 10
exact_first = true
"#;
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
