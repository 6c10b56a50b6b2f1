//! Data model shared by the answer pipeline, the HTTP service and the client.
pub mod audio;
pub mod chunk;
pub mod events;
pub mod framing;
pub mod retrieval;

//re-export types for easier access
pub use audio::Base64EncodedAudioBytes;
pub use chunk::{AudioSegment, BoundaryReason, TextChunk};
pub use events::{ChatRequest, WireEvent};
pub use framing::{NdjsonDecoder, WireError};
pub use retrieval::{Passage, RetrievalResult};
