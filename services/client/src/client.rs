use anyhow::{Context, Result, bail};
use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use voxrag_types::{ChatRequest, NdjsonDecoder, WireEvent};

pub type RecordStream = Pin<Box<dyn Stream<Item = Result<WireEvent>> + Send>>;

/// HTTP client for the chat endpoint.
#[derive(Clone)]
pub struct ChatbotClient {
    http: reqwest::Client,
    server_url: String,
}

impl ChatbotClient {
    pub fn new(server_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    /// Sends one question and returns its records in arrival order.
    pub async fn stream_chat(
        &self,
        message: &str,
        voice_enabled: bool,
    ) -> Result<RecordStream> {
        let request = ChatRequest::new(message).with_voice(voice_enabled);
        let response = self
            .http
            .post(format!("{}/chat", self.server_url))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach chat server at {}", self.server_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Chat server returned {}: {}", status, body);
        }
        Ok(Box::pin(decode_records(response.bytes_stream())))
    }
}

/// Reassembles NDJSON records from arbitrarily split network reads.
pub fn decode_records<E>(
    body: impl Stream<Item = Result<Bytes, E>> + Send + 'static,
) -> impl Stream<Item = Result<WireEvent>> + Send
where
    E: std::error::Error + Send + Sync + 'static,
{
    try_stream! {
        let mut body = Box::pin(body);
        let mut decoder = NdjsonDecoder::new();
        while let Some(bytes) = body.next().await {
            let bytes = bytes.context("Response stream interrupted")?;
            for event in decoder.push::<WireEvent>(&bytes)? {
                yield event;
            }
        }
        if let Some(event) = decoder.finish::<WireEvent>()? {
            yield event;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn reads(parts: &[&'static [u8]]) -> Vec<Result<Bytes, io::Error>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p))).collect()
    }

    #[tokio::test]
    async fn test_records_split_across_reads() {
        let body = futures::stream::iter(reads(&[
            b"{\"type\":\"text\",\"content\":\"Open \"}\n{\"type\":\"te",
            b"xt\",\"content\":\"9am.\"}\n{\"type\":\"audio\",\"content\":\"SUQz\",",
            b"\"isFinal\":true}",
        ]));

        let events: Vec<WireEvent> = decode_records(body).map(|e| e.unwrap()).collect().await;

        assert_eq!(
            events,
            vec![
                WireEvent::text("Open "),
                WireEvent::text("9am."),
                WireEvent::Audio {
                    content: "SUQz".to_string(),
                    is_final: true
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_interrupted_body_ends_with_error() {
        let body = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"type\":\"text\",\"content\":\"Partial\"}\n")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);

        let results: Vec<Result<WireEvent>> = decode_records(body).collect().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &WireEvent::text("Partial"));
        assert!(results[1].is_err());
    }

    #[tokio::test]
    async fn test_malformed_record_is_an_error() {
        let body = futures::stream::iter(reads(&[b"not json\n"]));
        let results: Vec<Result<WireEvent>> = decode_records(body).collect().await;
        assert!(results[0].is_err());
    }
}
