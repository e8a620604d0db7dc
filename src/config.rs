use anyhow::Context;
use oss_duplex_engine::OssOptions;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToneDefaults {
    pub freq: f32,
    pub seconds: f32,
    pub volume: f32,
    pub format: String,
}

impl Default for ToneDefaults {
    fn default() -> Self {
        Self {
            freq: 440.0,
            seconds: 2.0,
            volume: 0.5,
            format: "s16le".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub backend: OssOptions,
    pub log_level: Option<String>,
    pub tone: ToneDefaults,
}

impl CliConfig {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads `path` if given, then layers the environment over the
    /// `[backend]` table.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config '{}'", path.display()))?;
                Self::parse(&text)
                    .with_context(|| format!("Invalid config '{}'", path.display()))?
            }
            None => Self::default(),
        };
        config.backend = config
            .backend
            .with_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(CliConfig::parse("").unwrap(), CliConfig::default());
    }

    #[test]
    fn tables_are_merged_with_defaults() {
        let config = CliConfig::parse(
            r#"
            log_level = "debug"

            [backend]
            default_device = "/dev/dsp2"
            preferred_rate = 96000

            [tone]
            freq = 1000.0
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.backend.default_device, "/dev/dsp2");
        assert_eq!(config.backend.preferred_rate, 96000);
        assert_eq!(config.backend.default_mixer, "/dev/mixer");
        assert_eq!(config.tone.freq, 1000.0);
        assert_eq!(config.tone.seconds, 2.0);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(CliConfig::parse("[backend]\npreferred_rate = \"fast\"\n").is_err());
    }
}
