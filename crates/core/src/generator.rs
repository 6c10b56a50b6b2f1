use crate::context::Context;
use crate::prompt::PromptTemplate;
use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
#[cfg(test)]
use mockall::automock;
use std::pin::Pin;
use std::sync::Arc;

/// Lazy, finite, non-restartable sequence of answer fragments. Fragment
/// boundaries are whatever the model runtime emits; they are not sentence aligned.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A language model runtime that completes a prompt as a token stream.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Starts a streaming completion. Errors before the first fragment are
    /// returned here; errors mid-stream surface as `Err` items.
    async fn stream(&self, prompt: &str) -> Result<TokenStream>;
}

/// Turns context and question into a single prompt and streams the model's answer.
#[derive(Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn LanguageModel>,
    template: PromptTemplate,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, template: PromptTemplate) -> Self {
        Self { model, template }
    }

    pub fn prompt(&self, context: &Context, question: &str) -> String {
        self.template.render(context.as_prompt_context(), question)
    }

    /// Generation still runs for [`Context::NoRelevantContext`]; the template
    /// instructs the model to refuse.
    pub async fn generate(&self, context: &Context, question: &str) -> Result<TokenStream> {
        let prompt = self.prompt(context, question);
        tracing::debug!("Final prompt to language model:\n{}", prompt);
        self.model.stream(&prompt).await
    }
}

/// A stream yielding `fragments` in order.
#[cfg(test)]
pub(crate) fn token_stream(fragments: &[&str]) -> TokenStream {
    let items: Vec<Result<String>> = fragments.iter().map(|f| Ok(f.to_string())).collect();
    Box::pin(futures::stream::iter(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_generate_streams_model_fragments() {
        let mut model = MockLanguageModel::new();
        model
            .expect_stream()
            .withf(|prompt: &str| {
                prompt.contains("CONTEXT: NO_RELEVANT_CONTEXT")
                    && prompt.contains("USER QUESTION: Who won the cup?")
            })
            .times(1)
            .returning(|_| Ok(token_stream(&["I don't have ", "that information."])));

        let generator = AnswerGenerator::new(Arc::new(model), PromptTemplate::default());
        let tokens = generator
            .generate(&Context::NoRelevantContext, "Who won the cup?")
            .await
            .unwrap();
        let fragments: Vec<String> = tokens.map(|t| t.unwrap()).collect().await;

        assert_eq!(fragments.concat(), "I don't have that information.");
    }

    #[tokio::test]
    async fn test_direct_answer_is_used_as_prompt_context() {
        let mut model = MockLanguageModel::new();
        model
            .expect_stream()
            .withf(|prompt: &str| prompt.contains("CONTEXT: Open 9am to 8pm."))
            .times(1)
            .returning(|_| Ok(token_stream(&[])));

        let generator = AnswerGenerator::new(Arc::new(model), PromptTemplate::default());
        let context = Context::DirectAnswer("Open 9am to 8pm.".to_string());
        assert!(generator.generate(&context, "Hours?").await.is_ok());
    }
}
