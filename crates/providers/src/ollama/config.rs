use super::consts;

/// Sampling and runtime options forwarded verbatim in the `options` field.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_predict: i32,
    pub repeat_penalty: f32,
    pub num_ctx: u32,
    pub num_thread: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            num_predict: 1024,
            repeat_penalty: 1.0,
            num_ctx: 2048,
            num_thread: 8,
            top_p: 0.9,
            top_k: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
    model: String,
    embed_model: String,
    options: GenerateOptions,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    pub fn with_embed_model(mut self, embed_model: &str) -> Self {
        self.config.embed_model = embed_model.to_string();
        self
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.config.options = options;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: consts::BASE_URL.to_string(),
            model: consts::DEFAULT_MODEL.to_string(),
            embed_model: consts::DEFAULT_EMBED_MODEL.to_string(),
            options: GenerateOptions::default(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embed_model(&self) -> &str {
        &self.embed_model
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
