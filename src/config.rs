//! Configuration management for ipdo-agent.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::retry::RetryPolicy;

/// Slack on top of the retry budget for connection setup.
const DEADLINE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Upper bound for one HTTP attempt to the reasoning service, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    90
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    pub system_prompt: String,
    /// When set, the prompt is read from this file instead.
    #[serde(default)]
    pub system_prompt_file: Option<PathBuf>,
    /// Offset used for the `[AGORA=...]` marker (Brasília by default).
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_max_turns() -> u32 {
    6
}

fn default_utc_offset_hours() -> i32 {
    -3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_factor: 2.0,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_factor: config.backoff_factor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join(".ipdo-agent").join("banco_destaques.db"),
        }
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
Você é um assistente de operação do Sistema Interligado Nacional (SIN). \
Responda em português, de forma objetiva, com base nos destaques do IPDO \
(Informativo Preliminar Diário da Operação) disponíveis nas ferramentas.

Regras:
- A mensagem do usuário começa com [AGORA=YYYY-MM-DD HH:MM:SS]; use essa \
data para resolver referências como \"hoje\" e \"ontem\".
- Sempre consulte as ferramentas antes de responder sobre uma data; nunca \
invente valores.
- Se não souber quais datas existem, use listar_datas.
- Para perguntas gerais sobre um dia, prefira buscar_operacao_resumo.
- Se uma ferramenta retornar {\"erro\": ...} ou uma lista vazia, explique ao \
usuário que não há dados para o pedido.";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: "openai".to_string(),
                model: "gpt-5.2".to_string(),
                api_base: None,
                api_key: None,
                api_key_env: default_api_key_env(),
                max_output_tokens: default_max_output_tokens(),
                timeout_secs: default_timeout_secs(),
            },
            agent: AgentConfig {
                max_turns: default_max_turns(),
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
                system_prompt_file: None,
                utc_offset_hours: default_utc_offset_hours(),
            },
            retry: RetryConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".ipdo-agent").join("config.toml"))
    }

    /// Load the default config file (or built-in defaults), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let config = if config_path.exists() {
            Self::read_file(&config_path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    /// Load an explicit config file; it must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::read_file(path)?.with_env_overrides())
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(provider) = std::env::var("IPDO_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("IPDO_MODEL") {
            self.llm.model = model;
        }
        if let Ok(api_base) = std::env::var("IPDO_API_BASE") {
            self.llm.api_base = Some(api_base);
        }
        if let Ok(path) = std::env::var("IPDO_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        self
    }

    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = &self.llm.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        std::env::var(&self.llm.api_key_env).with_context(|| {
            format!(
                "API key not found. Either:\n  \
                 1. Set api_key in config file: {}\n  \
                 2. Set environment variable: export {}=your-key",
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                self.llm.api_key_env
            )
        })
    }

    /// The instructions sent at the start of every session.
    pub fn system_prompt(&self) -> Result<String> {
        match &self.agent.system_prompt_file {
            Some(path) => std::fs::read_to_string(path)
                .map(|s| s.trim().to_string())
                .with_context(|| format!("Failed to read system prompt: {}", path.display())),
            None => Ok(self.agent.system_prompt.clone()),
        }
    }

    /// Timeout of a single HTTP attempt.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs.max(1))
    }

    /// Deadline for one turn: every retry attempt plus its backoff.
    pub fn turn_deadline(&self) -> Duration {
        RetryPolicy::from(&self.retry).deadline_for(self.timeout(), DEADLINE_GRACE)
    }

    pub fn save_default() -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let default = Self::default();
        let content = toml::to_string_pretty(&default).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        Ok(config_path)
    }
}
