use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::services::ai_types::{ModelVariant, ReasoningEffort};

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_TTS_BASE_URL: &str = "https://translate.google.com";
const DEFAULT_TTS_LANG: &str = "en";

#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub variant: ModelVariant,
    pub max_attempts: usize,
    pub tts_lang: String,
    pub tts_base_url: String,
    pub resume: bool,
}

/// On-disk layout of a project, relative to [`Settings::root`].
#[derive(Debug, Clone)]
pub struct Paths {
    pub word_list: PathBuf,
    pub system_prompt: PathBuf,
    pub user_template: PathBuf,
    pub enriched: PathBuf,
    pub media_dir: PathBuf,
    pub manifest: PathBuf,
    pub ledger: PathBuf,
    pub deck: PathBuf,
}

impl Paths {
    pub fn under(root: &Path) -> Self {
        let out = root.join("out");
        let media_dir = out.join("media");
        Self {
            word_list: root.join("data").join("words.csv"),
            system_prompt: root.join("prompts").join("system.txt"),
            user_template: root.join("prompts").join("user_template.txt"),
            enriched: out.join("enriched.csv"),
            manifest: media_dir.join("manifest.json"),
            media_dir,
            ledger: out.join("ledger.jsonl"),
            deck: out.join("deck.apkg"),
        }
    }
}

impl Settings {
    /// Load `.env` from the project root, then read the process environment.
    pub fn from_env() -> Result<Self> {
        let root = std::env::var("VOCAB_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let dotenv = root.join(".env");
        if dotenv.exists() {
            if let Err(e) = dotenvy::from_path(&dotenv) {
                log::warn!("ignoring {}: {e}", dotenv.display());
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let root = get("VOCAB_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let api_key = get("OPENAI_API_KEY").or_else(|| get("DEEPSEEK_API_KEY"));

        let base_url = get("OPENAI_BASE_URL")
            .or_else(|| get("DEEPSEEK_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let reasoning = match get("LLM_REASONING") {
            Some(v) => parse_bool("LLM_REASONING", &v)?,
            None => false,
        };

        let variant = if reasoning {
            let effort = match get("LLM_REASONING_EFFORT") {
                Some(v) => ReasoningEffort::parse(&v).ok_or_else(|| {
                    PipelineError::Config(format!(
                        "LLM_REASONING_EFFORT must be low, medium or high (got '{v}')"
                    ))
                })?,
                None => ReasoningEffort::default(),
            };
            ModelVariant::Reasoning { effort }
        } else {
            ModelVariant::Chat
        };

        let max_attempts = match get("LLM_MAX_ATTEMPTS") {
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(PipelineError::Config(format!(
                        "LLM_MAX_ATTEMPTS must be a positive integer (got '{v}')"
                    )))
                }
            },
            None => 1,
        };

        let resume = match get("ENRICH_RESUME") {
            Some(v) => parse_bool("ENRICH_RESUME", &v)?,
            None => false,
        };

        Ok(Self {
            root,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            variant,
            max_attempts,
            tts_lang: get("TTS_LANG").unwrap_or_else(|| DEFAULT_TTS_LANG.to_string()),
            tts_base_url: get("TTS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TTS_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            resume,
        })
    }

    /// Defaults rooted at `root`, ignoring the environment.
    pub fn for_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            variant: ModelVariant::Chat,
            max_attempts: 1,
            tts_lang: DEFAULT_TTS_LANG.to_string(),
            tts_base_url: DEFAULT_TTS_BASE_URL.to_string(),
            resume: false,
        }
    }

    pub fn paths(&self) -> Paths {
        Paths::under(&self.root)
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(PipelineError::MissingCredential)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PipelineError::Config(format!(
            "{key} must be a boolean (got '{value}')"
        ))),
    }
}
