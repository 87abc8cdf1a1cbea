//! Global configuration loader for chatkeep.
//!
//! Reads `config.toml` from the data directory (`~/.chatkeep/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::{Path, PathBuf};

use chatkeep_types::config::GlobalConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CHATKEEP_DATA_DIR";

/// Resolve the data directory: `CHATKEEP_DATA_DIR`, else `~/.chatkeep`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chatkeep"),
    }
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse or validate, logs a warning and
///   returns the default.
/// - Otherwise returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    let config = match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            return GlobalConfig::default();
        }
    };

    if let Err(err) = config.llm.validate() {
        tracing::warn!(
            "Invalid [llm] section in {}: {err}, using defaults",
            config_path.display()
        );
        return GlobalConfig::default();
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.chat.session_timeout_secs, 300);
        assert_eq!(config.chat.max_history_length, 20);
        assert!(config.database_url.is_none());
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
database_url = "sqlite:///var/lib/chatkeep/sessions.db"

[chat]
session_timeout_secs = 60
max_tokens_per_session = 5000

[llm]
model = "gemini-2.5-pro"
temperature = 0.2

[log]
json = true
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(
            config.database_url.as_deref(),
            Some("sqlite:///var/lib/chatkeep/sessions.db")
        );
        assert_eq!(config.chat.session_timeout_secs, 60);
        assert_eq!(config.chat.max_tokens_per_session, 5000);
        // Unset keys keep their defaults.
        assert_eq!(config.chat.max_attempts, 3);
        assert_eq!(config.llm.model, "gemini-2.5-pro");
        assert!(config.log.json);
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.chat.session_timeout_secs, 300);
    }

    #[tokio::test]
    async fn load_global_config_out_of_range_temperature_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "[llm]\ntemperature = 3.5\n")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.llm.temperature, 1.0);
    }
}
