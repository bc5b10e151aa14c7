//! Server configuration
//!
//! Read once at startup from the environment (after `.env` is loaded).

use std::path::PathBuf;
use std::sync::Arc;

use agent_core::CompletionGateway;
use agent_runtime::{AnthropicConfig, AnthropicProvider, OllamaConfig, OllamaProvider};
use anyhow::{Context, bail};
use summarizer::ChunkingConfig;
use summarizer::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

/// Which completion backend to talk to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    Ollama,
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => bail!("unknown LLM_PROVIDER '{other}' (expected anthropic or ollama)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub provider: ProviderKind,
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub chunking: ChunkingConfig,
}

impl ServerConfig {
    /// `LLM_PROVIDER`, `BIND_ADDR`, `TRAINER_DATA_DIR`,
    /// `SUMMARY_CHUNK_SIZE`, `SUMMARY_CHUNK_OVERLAP`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let provider = lookup("LLM_PROVIDER")
            .as_deref()
            .unwrap_or("anthropic")
            .parse::<ProviderKind>()?;

        let chunk_size = parse_or(&lookup, "SUMMARY_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = parse_or(&lookup, "SUMMARY_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        let chunking = ChunkingConfig::new(chunk_size, chunk_overlap)
            .context("invalid summary chunking")?;

        Ok(Self {
            provider,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            data_dir: lookup("TRAINER_DATA_DIR").map_or_else(|| PathBuf::from("data"), PathBuf::from),
            chunking,
        })
    }

    /// Build the configured backend and the model it serves by default
    pub fn gateway(&self) -> anyhow::Result<(Arc<dyn CompletionGateway>, String)> {
        let (gateway, model) = match self.provider {
            ProviderKind::Anthropic => {
                let config = AnthropicConfig::from_env()?;
                let model = config.model.clone();
                let gateway: Arc<dyn CompletionGateway> = Arc::new(AnthropicProvider::new(config)?);
                (gateway, model)
            }
            ProviderKind::Ollama => {
                let config = OllamaConfig::from_env();
                let model = config.model.clone();
                let gateway: Arc<dyn CompletionGateway> = Arc::new(OllamaProvider::from_config(config));
                (gateway, model)
            }
        };

        tracing::info!(backend = gateway.name(), %model, "Completion backend configured");
        Ok((gateway, model))
    }
}

fn parse_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: usize,
) -> anyhow::Result<usize> {
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))
    })
}
