use serde::Deserialize;
use std::path::Path;

use super::ConfigError;
use crate::core::live::SessionConfig;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// gladia:
///   api_key: "your-gladia-key"
///   base_url: "https://api.gladia.io"
///   region: "eu-west"
///   user_agent: "my-app/1.0"
///   request_timeout_seconds: 30
///   connect_timeout_seconds: 10
///
/// live:
///   encoding: "wav/pcm"
///   bit_depth: 16
///   sample_rate: 16000
///   channels: 1
///   endpointing: 0.3
///   language_config:
///     languages: ["en", "fr"]
///     code_switching: true
///   messages_config:
///     receive_partial_transcripts: true
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub gladia: Option<GladiaYaml>,
    /// Default live session configuration
    pub live: Option<SessionConfig>,
}

/// API access settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GladiaYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub region: Option<String>,
    pub user_agent: Option<String>,
    pub request_timeout_seconds: Option<u64>,
    pub connect_timeout_seconds: Option<u64>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types (e.g. an unsupported sample rate)
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(ConfigError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::live::{AudioEncoding, SampleRate};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
gladia:
  api_key: "yaml-key"
  base_url: "http://localhost:8080"
  region: "eu-west"
  request_timeout_seconds: 30

live:
  encoding: "wav/ulaw"
  sample_rate: 8000
  endpointing: 0.5
  language_config:
    languages: ["en"]
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let gladia = config.gladia.as_ref().unwrap();
        assert_eq!(gladia.api_key, Some("yaml-key".to_string()));
        assert_eq!(gladia.region, Some("eu-west".to_string()));
        assert_eq!(gladia.request_timeout_seconds, Some(30));
        assert_eq!(gladia.connect_timeout_seconds, None);

        let live = config.live.as_ref().unwrap();
        assert_eq!(live.encoding, AudioEncoding::WavUlaw);
        assert_eq!(live.sample_rate, SampleRate::Hz8000);
        assert_eq!(live.channels, 1);
        assert_eq!(live.endpointing, Some(0.5));
        assert_eq!(
            live.language_config.as_ref().unwrap().languages,
            vec!["en".to_string()]
        );
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.gladia.is_none());
        assert!(config.live.is_none());
    }

    #[test]
    fn test_yaml_config_rejects_unsupported_sample_rate() {
        let yaml = "live:\n  sample_rate: 22050\n";
        assert!(serde_yaml::from_str::<YamlConfig>(yaml).is_err());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gladia.yaml");
        fs::write(&path, "gladia:\n  api_key: \"file-key\"\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(config.gladia.unwrap().api_key, Some("file-key".to_string()));
    }

    #[test]
    fn test_from_file_missing() {
        let result = YamlConfig::from_file(Path::new("/nonexistent/gladia.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
