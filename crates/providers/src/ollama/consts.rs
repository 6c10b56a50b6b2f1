pub const BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_EMBED_MODEL: &str = "bge-m3";

pub const GENERATE_PATH: &str = "/api/generate";
pub const EMBEDDINGS_PATH: &str = "/api/embeddings";
pub const TAGS_PATH: &str = "/api/tags";
