//! Configuration
//!
//! Maps environment variables (and an optional `.env` file) into a typed
//! [`Config`]. Built once at process start and handed to every component.

use crate::error::{TutorError, TutorResult};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Languages the tutor can teach, as (display name, ISO 639-1 code)
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("Spanish", "es"),
    ("French", "fr"),
    ("German", "de"),
    ("Italian", "it"),
    ("Portuguese", "pt"),
    ("Russian", "ru"),
    ("Japanese", "ja"),
    ("Korean", "ko"),
    ("Chinese", "zh"),
    ("Catalan", "ca"),
    ("English", "en"),
];

const DEFAULT_OPENAI_MODEL: &str = "gpt-4";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_HISTORY_TURNS: usize = 10;
const DEFAULT_TTS_VOICE: &str = "alloy";

/// Secret that never shows up in `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Settings for the cloud-hosted (OpenAI-compatible) model
#[derive(Debug, Clone)]
pub struct CloudSettings {
    pub api_key: ApiKey,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

/// Settings for the locally-hosted (Ollama) model
#[derive(Debug, Clone)]
pub struct LocalSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

/// Selected language-model provider with its own settings
#[derive(Debug, Clone)]
pub enum ProviderSettings {
    Cloud(CloudSettings),
    Local(LocalSettings),
}

impl ProviderSettings {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderSettings::Cloud(_) => "openai",
            ProviderSettings::Local(_) => "ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderSettings::Cloud(cloud) => &cloud.model,
            ProviderSettings::Local(local) => &local.model,
        }
    }
}

/// Speech-to-text backend named by `STT_PROVIDER`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttProvider {
    OpenAi,
    Google,
    Offline,
}

impl SttProvider {
    fn parse(value: &str) -> TutorResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" | "whisper" => Ok(SttProvider::OpenAi),
            "google" => Ok(SttProvider::Google),
            "offline" | "sphinx" => Ok(SttProvider::Offline),
            other => Err(TutorError::Config(format!(
                "invalid STT_PROVIDER '{other}', expected openai, google or offline"
            ))),
        }
    }
}

/// A language the tutor teaches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub name: String,
    pub code: String,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderSettings,
    /// Present whenever `OPENAI_API_KEY` is set, regardless of provider
    pub openai_api_key: Option<ApiKey>,
    pub openai_base_url: String,
    pub stt_provider: SttProvider,
    /// Resolved once: speech needs the OpenAI STT provider and a key
    pub speech_enabled: bool,
    /// Voice used for synthesized replies
    pub tts_voice: String,
    pub data_dir: PathBuf,
    pub history_turns: usize,
    pub debug: bool,
    pub log_level: String,
    pub languages: Vec<Language>,
}

/// Load `.env` (if any) and build the config from the process environment
pub fn load_config() -> TutorResult<Config> {
    if let Ok(path) = dotenv::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }
    Config::from_lookup(|key| std::env::var(key).ok())
}

impl Config {
    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> TutorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let openai_api_key = get("OPENAI_API_KEY").map(ApiKey::new);
        let openai_base_url = get("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let provider_name = get("MODEL_PROVIDER").unwrap_or_else(|| "local".to_string());
        let provider = match provider_name.to_lowercase().as_str() {
            "cloud" | "openai" => {
                let api_key = openai_api_key
                    .clone()
                    .ok_or(TutorError::MissingCredential("OPENAI_API_KEY"))?;
                ProviderSettings::Cloud(CloudSettings {
                    api_key,
                    model: get("OPENAI_MODEL")
                        .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                    base_url: openai_base_url.clone(),
                    temperature: parse_or(
                        "OPENAI_TEMPERATURE",
                        get("OPENAI_TEMPERATURE"),
                        DEFAULT_TEMPERATURE,
                    )?,
                })
            }
            "local" | "ollama" => {
                let base_url = get("OLLAMA_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string();
                if !base_url.starts_with("http") {
                    return Err(TutorError::Config(format!(
                        "OLLAMA_BASE_URL must be an HTTP URL, got '{base_url}'"
                    )));
                }
                ProviderSettings::Local(LocalSettings {
                    base_url,
                    model: get("OLLAMA_MODEL")
                        .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                    temperature: parse_or(
                        "OLLAMA_TEMPERATURE",
                        get("OLLAMA_TEMPERATURE"),
                        DEFAULT_TEMPERATURE,
                    )?,
                })
            }
            other => {
                return Err(TutorError::Config(format!(
                    "invalid MODEL_PROVIDER '{other}', expected cloud or local"
                )))
            }
        };

        let stt_provider = match get("STT_PROVIDER") {
            Some(value) => SttProvider::parse(&value)?,
            None => SttProvider::Google,
        };
        let speech_enabled = stt_provider == SttProvider::OpenAi && openai_api_key.is_some();

        let data_dir = get("TUTOR_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let languages = SUPPORTED_LANGUAGES
            .iter()
            .map(|(name, code)| Language {
                name: name.to_string(),
                code: code.to_string(),
            })
            .collect();

        Ok(Self {
            provider,
            openai_api_key,
            openai_base_url,
            stt_provider,
            speech_enabled,
            data_dir,
            history_turns: parse_or(
                "TUTOR_HISTORY_TURNS",
                get("TUTOR_HISTORY_TURNS"),
                DEFAULT_HISTORY_TURNS,
            )?,
            debug: get("DEBUG").map(|v| parse_flag(&v)).unwrap_or(false),
            tts_voice: get("TTS_VOICE").unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            languages,
        })
    }

    /// SQLite file holding sessions, interactions and metrics
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("progress.db")
    }

    /// Directory holding `<category>_lessons.json`
    pub fn lessons_dir(&self) -> PathBuf {
        self.data_dir.join("lessons")
    }

    /// Find a supported language by display name or code
    pub fn language(&self, name_or_code: &str) -> Option<&Language> {
        let wanted = name_or_code.trim();
        self.languages.iter().find(|lang| {
            lang.name.eq_ignore_ascii_case(wanted) || lang.code.eq_ignore_ascii_case(wanted)
        })
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lingua-tutor")
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> TutorResult<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| TutorError::Config(format!("{key} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> TutorResult<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_default_config_is_local() {
        let config = config_from(&[]).unwrap();
        assert!(matches!(config.provider, ProviderSettings::Local(_)));
        assert_eq!(config.provider.model(), "llama3.1");
        assert_eq!(config.history_turns, 10);
        assert_eq!(config.stt_provider, SttProvider::Google);
        assert!(!config.speech_enabled);
        assert!(!config.debug);
    }

    #[test]
    fn test_cloud_without_key_is_missing_credential() {
        let err = config_from(&[("MODEL_PROVIDER", "cloud")]).unwrap_err();
        assert!(matches!(err, TutorError::MissingCredential("OPENAI_API_KEY")));
    }

    #[test]
    fn test_local_without_key_is_fine() {
        let config = config_from(&[("MODEL_PROVIDER", "local"), ("OPENAI_API_KEY", "")]).unwrap();
        assert_eq!(config.provider.name(), "ollama");
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn test_cloud_settings() {
        let config = config_from(&[
            ("MODEL_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_TEMPERATURE", "1.9"),
        ])
        .unwrap();
        match config.provider {
            ProviderSettings::Cloud(cloud) => {
                assert_eq!(cloud.api_key.expose(), "sk-test");
                assert_eq!(cloud.model, "gpt-4");
                assert!((cloud.temperature - 1.9).abs() < f32::EPSILON);
            }
            other => panic!("expected cloud provider, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_temperature_passes_through() {
        let config = config_from(&[("OLLAMA_TEMPERATURE", "7.5")]).unwrap();
        match config.provider {
            ProviderSettings::Local(local) => assert!((local.temperature - 7.5).abs() < f32::EPSILON),
            other => panic!("expected local provider, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        assert!(matches!(
            config_from(&[("MODEL_PROVIDER", "anthropic")]),
            Err(TutorError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("OLLAMA_BASE_URL", "localhost:11434")]),
            Err(TutorError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("TUTOR_HISTORY_TURNS", "lots")]),
            Err(TutorError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("STT_PROVIDER", "carrier-pigeon")]),
            Err(TutorError::Config(_))
        ));
    }

    #[test]
    fn test_speech_capability_needs_openai_stt_and_key() {
        let without_key = config_from(&[("STT_PROVIDER", "openai")]).unwrap();
        assert!(!without_key.speech_enabled);

        let with_key =
            config_from(&[("STT_PROVIDER", "openai"), ("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert!(with_key.speech_enabled);
        // Speech does not depend on the chat provider
        assert_eq!(with_key.provider.name(), "ollama");
        assert_eq!(with_key.tts_voice, "alloy");

        let voiced = config_from(&[("TTS_VOICE", "nova")]).unwrap();
        assert_eq!(voiced.tts_voice, "nova");
    }

    #[test]
    fn test_language_lookup_and_paths() {
        let config = config_from(&[("TUTOR_DATA_DIR", "/tmp/tutor"), ("DEBUG", "yes")]).unwrap();
        assert_eq!(config.language("catalan").map(|l| l.code.as_str()), Some("ca"));
        assert_eq!(config.language("ES").map(|l| l.name.as_str()), Some("Spanish"));
        assert!(config.language("Klingon").is_none());
        assert_eq!(config.db_path(), PathBuf::from("/tmp/tutor/progress.db"));
        assert_eq!(config.lessons_dir(), PathBuf::from("/tmp/tutor/lessons"));
        assert!(config.debug);
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-secret");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
    }
}
