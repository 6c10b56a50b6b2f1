use secrecy::SecretString;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use voxrag_core::{ContextStrategy, PipelineConfig};
use voxrag_providers::ollama::GenerateOptions;
use voxrag_providers::{ChromaConfig, elevenlabs, huggingface, ollama};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// How answers are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Free generation by the local language model.
    Ollama,
    /// Extractive QA over the retrieved passage, with generation as fallback.
    #[value(name = "hf")]
    HuggingFace,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub backend: Backend,
    pub ollama: ollama::Config,
    pub chroma: ChromaConfig,
    pub huggingface: Option<huggingface::Config>,
    /// `None` when no speech credentials are configured.
    pub elevenlabs: Option<elevenlabs::Config>,
    pub system_template_path: PathBuf,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Loads configuration from environment variables, reading `.env` first if present.
    ///
    /// *   `BIND_ADDRESS`: Listen address. Defaults to "0.0.0.0:3000".
    /// *   `OLLAMA_BASE_URL`, `OLLAMA_MODEL`, `OLLAMA_EMBED_MODEL` and the `OLLAMA_*` sampling options.
    /// *   `CHROMA_HOST`, `CHROMA_PORT`, `CHROMA_COLLECTION`: The vector index.
    /// *   `HUGGINGFACE_API_KEY`: Required for the `hf` backend. `HUGGINGFACE_MODEL` is optional.
    /// *   `ELEVEN_LABS_API_KEY`, `ELEVEN_LABS_VOICE_ID`: Speech is disabled unless both are set.
    /// *   `SYSTEM_TEMPLATE_PATH`: Modelfile holding the system prompt.
    /// *   `RUST_LOG`: The logging level. Defaults to "INFO", or "DEBUG" when `VERBOSE=true`.
    /// *   Pipeline tuning: `FIRST_CHUNK_MIN_CHARS`, `SENTENCE_MIN_CHARS`, `MAX_CHUNK_CHARS`,
    ///     `INTER_CHUNK_DELAY_MS`, `TOP_K`, `SYNTHESIS_ENABLED`, `SYNTHESIS_TIMEOUT_MS`,
    ///     `CONTEXT_STRATEGY`, `QA_FALLBACK_THRESHOLD`.
    pub fn from_env(backend: Backend) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(backend, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        backend: Backend,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let verbose = parse_or(&lookup, "VERBOSE", false)?;
        let default_level = if verbose { Level::DEBUG } else { Level::INFO };
        let log_level = parse_or(&lookup, "RUST_LOG", default_level)?;

        let defaults = GenerateOptions::default();
        let options = GenerateOptions {
            temperature: parse_or(&lookup, "OLLAMA_TEMPERATURE", defaults.temperature)?,
            num_predict: parse_or(&lookup, "OLLAMA_NUM_PREDICT", defaults.num_predict)?,
            repeat_penalty: parse_or(&lookup, "OLLAMA_REPEAT_PENALTY", defaults.repeat_penalty)?,
            num_ctx: parse_or(&lookup, "OLLAMA_NUM_CTX", defaults.num_ctx)?,
            num_thread: parse_or(&lookup, "OLLAMA_NUM_THREADS", defaults.num_thread)?,
            top_p: parse_or(&lookup, "OLLAMA_TOP_P", defaults.top_p)?,
            top_k: parse_or(&lookup, "OLLAMA_TOP_K", defaults.top_k)?,
        };
        let default_ollama = ollama::Config::new();
        let ollama = ollama::Config::builder()
            .with_base_url(&string_or(&lookup, "OLLAMA_BASE_URL", default_ollama.base_url()))
            .with_model(&string_or(&lookup, "OLLAMA_MODEL", default_ollama.model()))
            .with_embed_model(&string_or(&lookup, "OLLAMA_EMBED_MODEL", default_ollama.embed_model()))
            .with_options(options)
            .build();

        let default_chroma = ChromaConfig::default();
        let chroma = ChromaConfig {
            host: string_or(&lookup, "CHROMA_HOST", &default_chroma.host),
            port: parse_or(&lookup, "CHROMA_PORT", default_chroma.port)?,
            collection: string_or(&lookup, "CHROMA_COLLECTION", &default_chroma.collection),
        };

        let huggingface = lookup("HUGGINGFACE_API_KEY").map(|key| {
            huggingface::Config::new(
                SecretString::from(key),
                &string_or(&lookup, "HUGGINGFACE_MODEL", huggingface::DEFAULT_MODEL),
            )
        });
        // Validate that the extractive backend has credentials.
        if backend == Backend::HuggingFace && huggingface.is_none() {
            return Err(ConfigError::MissingVar(
                "HUGGINGFACE_API_KEY must be set for 'hf' backend".to_string(),
            ));
        }

        let elevenlabs = match (lookup("ELEVEN_LABS_API_KEY"), lookup("ELEVEN_LABS_VOICE_ID")) {
            (Some(key), Some(voice)) => {
                Some(elevenlabs::Config::new(SecretString::from(key), &voice))
            }
            _ => None,
        };

        let pipeline = pipeline_from_lookup(&lookup)?;

        Ok(Self {
            bind_address,
            log_level,
            backend,
            ollama,
            chroma,
            huggingface,
            elevenlabs,
            system_template_path: PathBuf::from(string_or(
                &lookup,
                "SYSTEM_TEMPLATE_PATH",
                "./templates/default.txt",
            )),
            pipeline,
        })
    }
}

fn pipeline_from_lookup(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<PipelineConfig, ConfigError> {
    let defaults = PipelineConfig::default();

    let mut pacing = defaults.pacing;
    let inter_chunk_ms = parse_or(
        lookup,
        "INTER_CHUNK_DELAY_MS",
        pacing.inter_chunk.as_millis() as u64,
    )?;
    pacing.inter_chunk = Duration::from_millis(inter_chunk_ms);

    // Zero disables the bound.
    let default_timeout_ms = defaults
        .synthesis_timeout
        .map(|t| t.as_millis() as u64)
        .unwrap_or(0);
    let timeout_ms = parse_or(lookup, "SYNTHESIS_TIMEOUT_MS", default_timeout_ms)?;

    let config = PipelineConfig {
        first_chunk_min_chars: parse_or(lookup, "FIRST_CHUNK_MIN_CHARS", defaults.first_chunk_min_chars)?,
        sentence_min_chars: parse_or(lookup, "SENTENCE_MIN_CHARS", defaults.sentence_min_chars)?,
        max_chunk_chars: parse_or(lookup, "MAX_CHUNK_CHARS", defaults.max_chunk_chars)?,
        pacing,
        top_k: parse_or(lookup, "TOP_K", defaults.top_k)?,
        synthesis_enabled: parse_or(lookup, "SYNTHESIS_ENABLED", defaults.synthesis_enabled)?,
        synthesis_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        context_strategy: parse_or(lookup, "CONTEXT_STRATEGY", ContextStrategy::default())?,
        qa_fallback_threshold: parse_or(lookup, "QA_FALLBACK_THRESHOLD", defaults.qa_fallback_threshold)?,
        ..defaults
    };

    if config.top_k == 0 {
        return Err(ConfigError::InvalidValue(
            "TOP_K".to_string(),
            "must be at least 1".to_string(),
        ));
    }
    if config.max_chunk_chars == 0 {
        return Err(ConfigError::InvalidValue(
            "MAX_CHUNK_CHARS".to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(config)
}

fn string_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(backend: Backend, vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(backend, move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(Backend::Ollama, &[]).unwrap();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.ollama.base_url(), "http://localhost:11434");
        assert_eq!(config.ollama.model(), "llama3.2:3b");
        assert_eq!(config.ollama.embed_model(), "bge-m3");
        assert_eq!(config.chroma.base_url(), "http://localhost:8000");
        assert_eq!(config.chroma.collection, "qa-chatbot");
        assert!(config.elevenlabs.is_none());
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_pipeline_overrides() {
        let config = load(
            Backend::Ollama,
            &[
                ("FIRST_CHUNK_MIN_CHARS", "40"),
                ("SENTENCE_MIN_CHARS", "20"),
                ("MAX_CHUNK_CHARS", "120"),
                ("INTER_CHUNK_DELAY_MS", "50"),
                ("TOP_K", "5"),
                ("SYNTHESIS_ENABLED", "false"),
                ("SYNTHESIS_TIMEOUT_MS", "0"),
                ("CONTEXT_STRATEGY", "all"),
                ("QA_FALLBACK_THRESHOLD", "0.25"),
            ],
        )
        .unwrap();

        let pipeline = config.pipeline;
        assert_eq!(pipeline.first_chunk_min_chars, 40);
        assert_eq!(pipeline.sentence_min_chars, 20);
        assert_eq!(pipeline.max_chunk_chars, 120);
        assert_eq!(pipeline.pacing.inter_chunk, Duration::from_millis(50));
        assert_eq!(pipeline.pacing.first_chunk, Duration::from_millis(300));
        assert_eq!(pipeline.top_k, 5);
        assert!(!pipeline.synthesis_enabled);
        assert_eq!(pipeline.synthesis_timeout, None);
        assert_eq!(pipeline.context_strategy, ContextStrategy::AllPassages);
        assert_eq!(pipeline.qa_fallback_threshold, 0.25);
    }

    #[test]
    fn test_verbose_raises_default_level() {
        let config = load(Backend::Ollama, &[("VERBOSE", "true")]).unwrap();
        assert_eq!(config.log_level, Level::DEBUG);

        let config = load(Backend::Ollama, &[("VERBOSE", "true"), ("RUST_LOG", "warn")]).unwrap();
        assert_eq!(config.log_level, Level::WARN);
    }

    #[test]
    fn test_hf_backend_requires_key() {
        let err = load(Backend::HuggingFace, &[]).err().expect("expected an error");
        assert!(matches!(err, ConfigError::MissingVar(_)));

        let config = load(Backend::HuggingFace, &[("HUGGINGFACE_API_KEY", "hf_x")]).unwrap();
        assert_eq!(
            config.huggingface.unwrap().model,
            "deepset/roberta-base-squad2"
        );
    }

    #[test]
    fn test_speech_needs_key_and_voice() {
        let config = load(Backend::Ollama, &[("ELEVEN_LABS_API_KEY", "sk")]).unwrap();
        assert!(config.elevenlabs.is_none());

        let config = load(
            Backend::Ollama,
            &[("ELEVEN_LABS_API_KEY", "sk"), ("ELEVEN_LABS_VOICE_ID", "voice-1")],
        )
        .unwrap();
        assert_eq!(config.elevenlabs.unwrap().voice_id, "voice-1");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (key, value) in [
            ("BIND_ADDRESS", "nowhere"),
            ("RUST_LOG", "loud"),
            ("TOP_K", "0"),
            ("CHROMA_PORT", "eighty"),
            ("CONTEXT_STRATEGY", "best"),
            ("SYNTHESIS_ENABLED", "sometimes"),
        ] {
            let err = load(Backend::Ollama, &[(key, value)]).err();
            assert!(
                matches!(err, Some(ConfigError::InvalidValue(ref var, _)) if var == key),
                "{key}={value} should be rejected"
            );
        }
    }
}
