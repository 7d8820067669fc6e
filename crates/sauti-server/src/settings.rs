//! Layered configuration: optional TOML file, then `SAUTI__*` environment

use anyhow::Context;
use sauti_core::{ServerConfig, StudioConfig};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "SAUTI_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub studio: StudioConfig,
}

impl Settings {
    /// Load from `$SAUTI_CONFIG` or the per-user config file, if present,
    /// with `SAUTI__SECTION__KEY` environment variables taking precedence
    pub fn load() -> anyhow::Result<(Self, Option<PathBuf>)> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(default_config_path);
        let settings = Self::load_from(path.clone())?;
        Ok((settings, path))
    }

    pub fn load_from(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = &path {
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SAUTI")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sauti").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sauti_core::{AudioOutput, Voice};

    #[test]
    fn test_toml_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("sauti-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9123
audio_output = "memory"

[studio]
char_limit = 2000
default_voice = "charon"

[studio.gemini]
timeout_secs = 30
"#,
        )
        .unwrap();

        let settings = Settings::load_from(Some(path)).unwrap();
        assert_eq!(settings.server.port, 9123);
        assert_eq!(settings.server.audio_output, AudioOutput::Memory);
        assert_eq!(settings.studio.char_limit, 2000);
        assert_eq!(settings.studio.default_voice, Voice::Charon);
        assert_eq!(settings.studio.gemini.timeout_secs, 30);
        assert_eq!(settings.studio.sample_rate, 24000);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings =
            Settings::load_from(Some(PathBuf::from("/nonexistent/sauti/config.toml"))).unwrap();
        assert_eq!(settings.studio.download_filename, "generated_speech.wav");
    }
}
