use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;
use voxrag_core::{
    AnswerBackend, AnswerGenerator, PromptTemplate, ResponsePipeline, SpeechSynthesizer,
    load_system_template,
};
use voxrag_providers::{ChromaRetriever, elevenlabs, huggingface, ollama};

mod config;
mod routes;

use config::{Backend, Config};

#[derive(Parser)]
#[command(version, about = "Retrieval-augmented chat server with streamed speech")]
struct Cli {
    /// How answers are produced
    #[arg(value_enum, default_value_t = Backend::Ollama)]
    backend: Backend,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env(cli.backend)?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    info!(
        "Configuration loaded: backend={:?}, model={}, collection={}",
        config.backend,
        config.ollama.model(),
        config.chroma.collection
    );

    let ollama = Arc::new(ollama::Client::new(config.ollama.clone()));
    ollama
        .health_check()
        .await
        .context("Ollama startup probe failed")?;

    let system = load_system_template(&config.system_template_path).unwrap_or_else(|e| {
        warn!("{:#}; using the built-in system prompt", e);
        String::new()
    });
    let generator = AnswerGenerator::new(ollama.clone(), PromptTemplate::new(system));

    let backend = match config.backend {
        Backend::Ollama => AnswerBackend::Generative(generator),
        Backend::HuggingFace => {
            let hf = config
                .huggingface
                .clone()
                .context("Hugging Face credentials are missing")?;
            AnswerBackend::ExtractiveQa {
                qa: Arc::new(huggingface::Client::new(hf)),
                fallback: generator,
                threshold: config.pipeline.qa_fallback_threshold,
            }
        }
    };

    let retriever =
        ChromaRetriever::connect(&config.chroma, ollama.clone(), config.pipeline.top_k).await?;

    let synthesizer: Option<Arc<dyn SpeechSynthesizer>> = match config.elevenlabs.clone() {
        Some(speech) => Some(Arc::new(elevenlabs::Client::new(speech))),
        None => {
            warn!("ELEVEN_LABS_API_KEY or ELEVEN_LABS_VOICE_ID not set, speech disabled");
            None
        }
    };

    let pipeline = ResponsePipeline::new(
        Arc::new(retriever),
        backend,
        synthesizer,
        config.pipeline.clone(),
    );
    info!("Answer backend: {}", pipeline.backend().name());
    let app = routes::router(routes::AppState::new(pipeline));

    info!("Starting chat server, listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match ollama.stats() {
        Ok(stats) => info!(
            "Shutting down after {} generations ({} input, {} output tokens)",
            stats.generations(),
            stats.input_tokens(),
            stats.output_tokens()
        ),
        Err(e) => warn!("{}", e),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
