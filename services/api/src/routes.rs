use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use voxrag_core::ResponsePipeline;
use voxrag_types::ChatRequest;

/// Shared by every request; each request still gets its own pipeline run.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ResponsePipeline>,
}

impl AppState {
    pub fn new(pipeline: ResponsePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Configure a permissive CORS policy so a separately served frontend can call the API.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Streams the answer as newline-delimited JSON records.
///
/// The body is fed from the pipeline's bounded channel. When the client goes
/// away the body is dropped, which closes the channel and stops the pipeline.
pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    if request.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "message must not be empty").into_response();
    }

    let events = state.pipeline.spawn(request);
    let lines = ReceiverStream::new(events).map(|event| event.to_line().map(Bytes::from));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(lines),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use voxrag_core::{
        AnswerBackend, AnswerGenerator, LanguageModel, PacingConfig, PipelineConfig,
        PromptTemplate, Retriever, SpeechSynthesizer, TokenStream,
    };
    use voxrag_types::{Passage, RetrievalResult, WireEvent};

    struct LibraryIndex;

    #[async_trait]
    impl Retriever for LibraryIndex {
        async fn query(&self, _text: &str) -> Result<RetrievalResult> {
            Ok(RetrievalResult::from_passages(vec![Passage::new(
                "The library is open from 9am to 8pm.",
            )]))
        }
    }

    struct ScriptedModel(&'static [&'static str]);

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn stream(&self, _prompt: &str) -> Result<TokenStream> {
            let fragments: Vec<Result<String>> =
                self.0.iter().map(|f| Ok(f.to_string())).collect();
            Ok(Box::pin(futures::stream::iter(fragments)))
        }
    }

    /// "Speaks" by returning the text itself as the clip.
    struct EchoVoice;

    #[async_trait]
    impl SpeechSynthesizer for EchoVoice {
        async fn synthesize(&self, text: &str) -> Result<Bytes> {
            Ok(Bytes::from(text.to_string()))
        }
    }

    fn state(fragments: &'static [&'static str]) -> AppState {
        let generator =
            AnswerGenerator::new(Arc::new(ScriptedModel(fragments)), PromptTemplate::default());
        let config = PipelineConfig {
            pacing: PacingConfig::none(),
            ..PipelineConfig::default()
        };
        AppState::new(ResponsePipeline::new(
            Arc::new(LibraryIndex),
            AnswerBackend::Generative(generator),
            Some(Arc::new(EchoVoice)),
            config,
        ))
    }

    async fn records(response: Response) -> Vec<WireEvent> {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        std::str::from_utf8(&body)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_text_only_chat_streams_ndjson() {
        let response = chat(
            State(state(&["The library is ", "open from 9am ", "to 8pm."])),
            Json(ChatRequest::new("What are the library hours?")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        let events = records(response).await;
        assert_eq!(
            events,
            vec![
                WireEvent::text("The library is "),
                WireEvent::text("open from 9am "),
                WireEvent::text("to 8pm."),
            ]
        );
    }

    #[tokio::test]
    async fn test_voice_chat_interleaves_audio() {
        let first = "The library opens at nine and closes at eight tonight. ";
        let response = chat(
            State(state(&[
                "The library opens at nine ",
                "and closes at eight tonight. ",
                "Welcome!",
            ])),
            Json(ChatRequest::new("Hours?").with_voice(true)),
        )
        .await;

        let events = records(response).await;
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], WireEvent::Text { .. }));
        assert!(matches!(events[1], WireEvent::Text { .. }));
        assert!(matches!(events[3], WireEvent::Text { .. }));

        let WireEvent::Audio { content, is_final } = &events[2] else {
            panic!("expected audio after the first chunk");
        };
        assert!(!is_final);
        let clip = voxrag_types::audio::decode(content).unwrap();
        assert_eq!(clip, first.as_bytes());

        assert!(matches!(
            &events[4],
            WireEvent::Audio { is_final: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let response = chat(State(state(&[])), Json(ChatRequest::new("   "))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
