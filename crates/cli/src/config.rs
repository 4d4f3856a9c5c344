//! Bot configuration file.
//!
//! A single JSON document with optional `session` and `runtime` sections.
//! Every field falls back to its default, so an empty object is valid.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use wxweb::{RuntimeOptions, SessionConfig};

use crate::cli::LoginArgs;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotConfig {
	pub session: SessionConfig,
	pub runtime: RuntimeOptions,
}

impl BotConfig {
	/// Loads `explicit` if given, otherwise the default path.
	///
	/// A missing explicit file is an error; a missing default file is not.
	pub fn load(explicit: Option<&Path>) -> Result<Self> {
		match explicit {
			Some(path) => Self::load_from(path),
			None => {
				let path = default_config_path();
				if path.exists() {
					Self::load_from(&path)
				} else {
					tracing::debug!(path = %path.display(), "No config file, using defaults");
					Ok(Self::default())
				}
			}
		}
	}

	pub fn load_from(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
		let config = serde_json::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
		tracing::debug!(path = %path.display(), "Loaded config");
		Ok(config)
	}

	/// Flags win over file values.
	pub fn apply(&mut self, args: &LoginArgs) {
		if let Some(lang) = &args.lang {
			self.session.lang = lang.clone();
		}
		if let Some(max) = args.max_concurrent_handlers {
			self.runtime.max_concurrent_handlers = max;
		}
		if let Some(secs) = args.grace {
			self.runtime.shutdown_grace_ms = secs.saturating_mul(1000);
		}
	}
}

/// `$XDG_CONFIG_HOME/wxbot/config.json`, falling back to the platform config dir.
pub fn default_config_path() -> PathBuf {
	std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(dirs::config_dir)
		.unwrap_or_else(|| PathBuf::from("."))
		.join("wxbot")
		.join("config.json")
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use tempfile::NamedTempFile;

	use super::*;

	fn write(content: &str) -> NamedTempFile {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[test]
	fn test_partial_file_keeps_defaults() {
		let file = write(r#"{"session": {"lang": "en_US"}, "runtime": {"maxConcurrentHandlers": 8}}"#);
		let config = BotConfig::load(Some(file.path())).unwrap();

		assert_eq!(config.session.lang, "en_US");
		assert_eq!(config.session.app_id, SessionConfig::default().app_id);
		assert_eq!(config.runtime.max_concurrent_handlers, 8);
		assert_eq!(config.runtime.batch_channel_capacity, 1000);
		assert_eq!(config.runtime.shutdown_grace_ms, 5000);
	}

	#[test]
	fn test_empty_object() {
		let file = write("{}");
		let config = BotConfig::load(Some(file.path())).unwrap();
		assert_eq!(config.runtime, RuntimeOptions::default());
		assert!(!config.session.has_shard());
	}

	#[test]
	fn test_missing_explicit_file() {
		let dir = tempfile::tempdir().unwrap();
		let err = BotConfig::load(Some(dir.path().join("absent.json").as_path())).unwrap_err();
		assert!(err.to_string().contains("reading config"));
	}

	#[test]
	fn test_malformed_file() {
		let file = write(r#"{"runtime": {"maxConcurrentHandlers": "lots"}}"#);
		let err = BotConfig::load(Some(file.path())).unwrap_err();
		assert!(err.to_string().contains("parsing config"));
	}

	#[test]
	fn test_flags_override_file() {
		let file = write(r#"{"session": {"lang": "en_US"}, "runtime": {"maxConcurrentHandlers": 8}}"#);
		let mut config = BotConfig::load(Some(file.path())).unwrap();
		config.apply(&LoginArgs {
			lang: Some("zh_TW".into()),
			grace: Some(2),
			..LoginArgs::default()
		});

		assert_eq!(config.session.lang, "zh_TW");
		assert_eq!(config.runtime.max_concurrent_handlers, 8);
		assert_eq!(config.runtime.shutdown_grace_ms, 2000);
	}

	#[test]
	fn test_default_path_name() {
		assert!(default_config_path().ends_with("wxbot/config.json"));
	}
}
