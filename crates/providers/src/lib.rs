//! HTTP clients for the external capabilities the answer pipeline consumes.
pub mod chroma;
pub mod elevenlabs;
pub mod huggingface;
pub mod ollama;

pub use chroma::{ChromaConfig, ChromaRetriever, Embedder};
