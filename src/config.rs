//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. The `--config` command-line flag
//! 2. `$MAILPOST_CONFIG` (environment variable)
//! 3. `~/.config/mailpost/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailpost\config.toml` (Windows)
//! 4. Built-in defaults

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{MailpostError, Result};
use crate::publish::normalize::DEFAULT_JPEG_QUALITY;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Where messages come from.
    pub source: SourceConfig,
    /// Where posts and images go.
    pub publish: PublishConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override directory for the log file.
    pub log_dir: Option<PathBuf>,
    /// Time between inbox checks in `watch` mode, e.g. "10s", "5m", "1h".
    pub interval: String,
}

/// Message source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Inbox directory; every `.eml`/MBOX file directly inside it is read.
    pub inbox: PathBuf,
    /// Only accept messages whose sender address equals this one.
    pub post_from: Option<String>,
    /// Move consumed inbox files into `<inbox>/processed/` after a batch.
    ///
    /// When off, every `watch` pass reads the whole inbox again, so posts
    /// are rewritten and remote images fetched again on each tick.
    pub archive_processed: bool,
    /// Timeout for remote image downloads, in seconds.
    pub fetch_timeout_secs: u64,
}

/// Output layout settings.
///
/// `image_dir` and `post_dir` are templates recognizing the `<date>` and
/// `<type>` tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Directory template for saved images.
    pub image_dir: String,
    /// Directory template for saved posts.
    pub post_dir: String,
    /// `strftime` layout used to render the `<date>` token.
    pub date_path_fmt: String,
    /// Site root URL embedded in rewritten image references.
    pub base_url: String,
    /// URL path between `base_url` and the date part.
    pub image_path: String,
    /// Images wider than this are downsampled (0 disables resizing).
    pub max_img_width: u32,
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
            interval: "5m".to_string(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            inbox: PathBuf::from("inbox"),
            post_from: None,
            archive_processed: true,
            fetch_timeout_secs: 30,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            image_dir: "static/images/<date>".to_string(),
            post_dir: "content/<type>".to_string(),
            date_path_fmt: "%Y/%m".to_string(),
            base_url: "/".to_string(),
            image_path: "images".to_string(),
            max_img_width: 1024,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl SourceConfig {
    /// Whether repeated passes over the inbox see the same files again.
    pub fn rereads_inbox(&self) -> bool {
        !self.archive_processed
    }
}

impl Config {
    /// Reject settings that would only fail later, mid-batch.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_strftime(&self.publish.date_path_fmt) {
            return Err(MailpostError::Config(format!(
                "invalid date_path_fmt '{}'",
                self.publish.date_path_fmt
            )));
        }
        if !(1..=100).contains(&self.publish.jpeg_quality) {
            return Err(MailpostError::Config(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.publish.jpeg_quality
            )));
        }
        parse_interval(&self.general.interval)?;
        Ok(())
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration.
///
/// An explicit path must exist and parse. Otherwise the standard locations
/// are searched and the defaults are returned if nothing is found.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(MailpostError::FileNotFound(path.to_path_buf()));
            }
            read_config(path)?
        }
        None => match config_file_path() {
            Some(path) if path.exists() => read_config(&path)?,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| MailpostError::io(path, e))?;
    let cfg = toml::from_str::<Config>(&contents)
        .map_err(|e| MailpostError::Config(format!("{}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(cfg)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILPOST_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailpost").join("config.toml"))
}

/// Return the directory for the log file.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailpost")
}

/// Whether `layout` only contains strftime items chrono understands.
pub fn is_valid_strftime(layout: &str) -> bool {
    if StrftimeItems::new(layout).any(|item| matches!(item, Item::Error)) {
        return false;
    }
    // Time and offset specifiers parse fine but cannot render a bare date.
    let mut rendered = String::new();
    write!(rendered, "{}", chrono::NaiveDate::default().format(layout)).is_ok()
}

/// Parse a polling interval such as `30s`, `5m`, `1h` or `1h30m`.
pub fn parse_interval(raw: &str) -> Result<Duration> {
    let invalid = || MailpostError::Config(format!("invalid interval '{raw}'"));
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let unit = match ch {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            _ => return Err(invalid()),
        };
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        total = total.saturating_add(value.saturating_mul(unit));
        digits.clear();
    }
    if !digits.is_empty() {
        // Bare number: seconds.
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        total = total.saturating_add(value);
    }
    if total == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.publish.post_dir, "content/<type>");
        assert_eq!(cfg.publish.image_dir, "static/images/<date>");
        assert_eq!(cfg.publish.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(DEFAULT_JPEG_QUALITY, 75);
        assert!(cfg.source.archive_processed);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rereads_inbox_without_archiving() {
        let mut source = SourceConfig::default();
        assert!(!source.rereads_inbox());
        source.archive_processed = false;
        assert!(source.rereads_inbox());
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.publish.base_url, cfg.publish.base_url);
        assert_eq!(parsed.publish.max_img_width, cfg.publish.max_img_width);
        assert_eq!(parsed.general.interval, cfg.general.interval);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[source]
post_from = "me@example.com"

[publish]
base_url = "https://blog.example.com"
max_img_width = 640
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.source.post_from.as_deref(), Some("me@example.com"));
        assert_eq!(cfg.publish.base_url, "https://blog.example.com");
        assert_eq!(cfg.publish.max_img_width, 640);
        // Other fields use defaults
        assert_eq!(cfg.publish.date_path_fmt, "%Y/%m");
        assert_eq!(cfg.source.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, MailpostError::FileNotFound(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailpost.toml");
        std::fs::write(&path, "[publish]\njpeg_quality = 90\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.publish.jpeg_quality, 90);
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let mut cfg = Config::default();
        cfg.publish.jpeg_quality = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_date_layout() {
        let mut cfg = Config::default();
        cfg.publish.date_path_fmt = "%Y/%Q".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_interval("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_interval("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_interval("45").unwrap(), Duration::from_secs(45));
        assert!(parse_interval("").is_err());
        assert!(parse_interval("5x").is_err());
        assert!(parse_interval("0s").is_err());
    }
}
