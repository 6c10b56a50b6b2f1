pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod multiplexer;
pub mod pipeline;
pub mod prompt;
pub mod qa;
pub mod retriever;
pub mod segmenter;
pub mod session;
pub mod synthesizer;

pub use config::{ContextStrategy, PacingConfig, PipelineConfig};
pub use context::{Context, ContextFormatter, NO_RELEVANT_CONTEXT};
pub use error::{GENERIC_FAILURE_MESSAGE, PipelineError, SynthesisError};
pub use generator::{AnswerGenerator, LanguageModel, TokenStream};
pub use multiplexer::StreamMultiplexer;
pub use pipeline::ResponsePipeline;
pub use prompt::{PromptTemplate, load_system_template};
pub use qa::{AnswerBackend, QA_REFUSAL, QaAnswer, QuestionAnswerer};
pub use retriever::Retriever;
pub use segmenter::{ChunkThresholds, SegmenterState, TextSegmenter};
pub use session::GenerationSession;
pub use synthesizer::{SpeechSynthesizer, SynthesisStage};
