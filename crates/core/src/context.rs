use crate::config::ContextStrategy;
use voxrag_types::RetrievalResult;

/// Marker placed in the prompt when retrieval found nothing usable.
pub const NO_RELEVANT_CONTEXT: &str = "NO_RELEVANT_CONTEXT";

/// What retrieval contributes to a request. Exactly one form holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// Passage text to ground generation on.
    Passages(String),
    /// A curated answer taken from the best passage's metadata.
    DirectAnswer(String),
    NoRelevantContext,
}

impl Context {
    /// The string substituted into the prompt's context slot.
    pub fn as_prompt_context(&self) -> &str {
        match self {
            Self::Passages(text) | Self::DirectAnswer(text) => text,
            Self::NoRelevantContext => NO_RELEVANT_CONTEXT,
        }
    }
}

/// Reduces a retrieval result to a [`Context`] by priority: sentinel first, then a
/// curated answer on the best passage, then the passage text itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFormatter {
    strategy: ContextStrategy,
}

impl ContextFormatter {
    pub fn new(strategy: ContextStrategy) -> Self {
        Self { strategy }
    }

    pub fn format(&self, result: &RetrievalResult) -> Context {
        let first = result.first();
        if first.is_general() {
            tracing::debug!("No relevant documents found, general sentinel returned");
            return Context::NoRelevantContext;
        }

        if let Some(answer) = first.direct_answer() {
            tracing::debug!(
                "Using answer from metadata (distance: {:?}): {}",
                first.distance(),
                answer
            );
            return Context::DirectAnswer(answer.to_string());
        }

        let text = match self.strategy {
            ContextStrategy::FirstPassage => first.text().to_string(),
            ContextStrategy::AllPassages => result
                .iter()
                .map(|passage| passage.text())
                .collect::<Vec<_>>()
                .join("\n\n"),
        };
        tracing::debug!("Using document content as context: {}", text);
        Context::Passages(text)
    }
}
