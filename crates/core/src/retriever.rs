use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use voxrag_types::RetrievalResult;

/// Looks up passages relevant to a question.
///
/// Implementations rank closest-first and cap the result at their configured
/// top-k. "Nothing matched" is not an error: it is reported through the sentinel
/// passage of [`RetrievalResult::no_match`], so an `Err` always means the index
/// itself could not be reached.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn query(&self, text: &str) -> Result<RetrievalResult>;
}
