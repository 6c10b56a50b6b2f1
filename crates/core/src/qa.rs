//! Answer backends: free generation, or extractive QA with a generative fallback.

use crate::context::Context;
use crate::generator::{AnswerGenerator, TokenStream};
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

/// Fixed answer of the extractive backend when retrieval found nothing.
pub const QA_REFUSAL: &str =
    "I'm sorry, but I don't have enough relevant information to answer your question accurately.";

#[derive(Debug, Clone, PartialEq)]
pub struct QaAnswer {
    pub answer: String,
    /// Model confidence in `0.0..=1.0`.
    pub score: f32,
}

impl QaAnswer {
    pub fn to_response(&self) -> String {
        let percent = (self.score * 100.0).round() as u32;
        format!(
            "Based on the provided information (confidence: {percent}%), {}",
            self.answer
        )
    }
}

/// Extracts an answer span for `question` out of `context`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<QaAnswer>;
}

#[derive(Clone)]
pub enum AnswerBackend {
    Generative(AnswerGenerator),
    ExtractiveQa {
        qa: Arc<dyn QuestionAnswerer>,
        fallback: AnswerGenerator,
        /// Scores below this are answered by `fallback` instead.
        threshold: f32,
    },
}

impl AnswerBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generative(_) => "generative",
            Self::ExtractiveQa { .. } => "extractive-qa",
        }
    }

    pub async fn answer(&self, context: &Context, question: &str) -> Result<TokenStream> {
        let (qa, fallback, threshold) = match self {
            Self::Generative(generator) => return generator.generate(context, question).await,
            Self::ExtractiveQa {
                qa,
                fallback,
                threshold,
            } => (qa, fallback, *threshold),
        };

        let passages = match context {
            Context::NoRelevantContext => return Ok(single_fragment(QA_REFUSAL)),
            Context::DirectAnswer(answer) => return Ok(single_fragment(answer)),
            Context::Passages(passages) => passages,
        };

        let result = qa.answer(question, passages).await?;
        if result.score < threshold {
            tracing::info!(
                "Low QA confidence ({:.3} < {}), falling back to generation",
                result.score,
                threshold
            );
            return fallback.generate(context, question).await;
        }
        Ok(single_fragment(&result.to_response()))
    }
}

fn single_fragment(text: &str) -> TokenStream {
    let fragment: Result<String> = Ok(text.to_string());
    Box::pin(futures::stream::iter(vec![fragment]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{MockLanguageModel, token_stream};
    use crate::prompt::PromptTemplate;
    use futures::StreamExt;

    async fn collect(stream: TokenStream) -> String {
        let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
        fragments.concat()
    }

    fn unused_generator() -> AnswerGenerator {
        let mut model = MockLanguageModel::new();
        model.expect_stream().never();
        AnswerGenerator::new(Arc::new(model), PromptTemplate::default())
    }

    fn qa_backend(qa: MockQuestionAnswerer, fallback: AnswerGenerator) -> AnswerBackend {
        AnswerBackend::ExtractiveQa {
            qa: Arc::new(qa),
            fallback,
            threshold: 0.1,
        }
    }

    #[test]
    fn test_confidence_is_rounded_percent() {
        let answer = QaAnswer {
            answer: "9am to 8pm".to_string(),
            score: 0.876,
        };
        assert_eq!(
            answer.to_response(),
            "Based on the provided information (confidence: 88%), 9am to 8pm"
        );
    }

    #[tokio::test]
    async fn test_no_context_returns_fixed_refusal() {
        let mut qa = MockQuestionAnswerer::new();
        qa.expect_answer().never();

        let backend = qa_backend(qa, unused_generator());
        let answer = backend
            .answer(&Context::NoRelevantContext, "Who won?")
            .await
            .unwrap();
        assert_eq!(collect(answer).await, QA_REFUSAL);
    }

    #[tokio::test]
    async fn test_direct_answer_is_streamed_verbatim() {
        let mut qa = MockQuestionAnswerer::new();
        qa.expect_answer().never();

        let backend = qa_backend(qa, unused_generator());
        let context = Context::DirectAnswer("Open 9am to 8pm.".to_string());
        let answer = backend.answer(&context, "Hours?").await.unwrap();
        assert_eq!(collect(answer).await, "Open 9am to 8pm.");
    }

    #[tokio::test]
    async fn test_confident_answer_skips_generation() {
        let mut qa = MockQuestionAnswerer::new();
        qa.expect_answer()
            .withf(|question: &str, context: &str| {
                question == "When does it open?" && context == "The library opens at 9am."
            })
            .times(1)
            .returning(|_, _| {
                Ok(QaAnswer {
                    answer: "9am".to_string(),
                    score: 0.5,
                })
            });

        let backend = qa_backend(qa, unused_generator());
        let context = Context::Passages("The library opens at 9am.".to_string());
        let answer = backend.answer(&context, "When does it open?").await.unwrap();
        assert_eq!(
            collect(answer).await,
            "Based on the provided information (confidence: 50%), 9am"
        );
    }

    #[tokio::test]
    async fn test_low_confidence_falls_back_to_generation() {
        let mut qa = MockQuestionAnswerer::new();
        qa.expect_answer().times(1).returning(|_, _| {
            Ok(QaAnswer {
                answer: "maybe".to_string(),
                score: 0.02,
            })
        });
        let mut model = MockLanguageModel::new();
        model
            .expect_stream()
            .times(1)
            .returning(|_| Ok(token_stream(&["It opens ", "at 9am."])));

        let fallback = AnswerGenerator::new(Arc::new(model), PromptTemplate::default());
        let backend = qa_backend(qa, fallback);
        let context = Context::Passages("The library opens at 9am.".to_string());
        let answer = backend.answer(&context, "When does it open?").await.unwrap();
        assert_eq!(collect(answer).await, "It opens at 9am.");
    }

    #[tokio::test]
    async fn test_qa_failure_propagates() {
        let mut qa = MockQuestionAnswerer::new();
        qa.expect_answer()
            .returning(|_, _| Err(anyhow::anyhow!("inference API returned 503")));

        let backend = qa_backend(qa, unused_generator());
        let context = Context::Passages("text".to_string());
        assert!(backend.answer(&context, "q").await.is_err());
    }
}
