use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use voxrag_core::{QaAnswer, QuestionAnswerer};

pub const BASE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_MODEL: &str = "deepset/roberta-base-squad2";

#[derive(serde::Serialize)]
struct QaInputs<'a> {
    question: &'a str,
    context: &'a str,
}

#[derive(serde::Serialize)]
struct QaRequest<'a> {
    inputs: QaInputs<'a>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum QaResponse {
    Answer { answer: String, score: f32 },
    Error { error: String },
}

impl QaResponse {
    fn into_answer(self) -> Result<QaAnswer> {
        match self {
            Self::Answer { answer, score } => Ok(QaAnswer { answer, score }),
            Self::Error { error } => bail!("Hugging Face inference error: {}", error),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
}

impl Config {
    pub fn new(api_key: SecretString, model: &str) -> Self {
        Self {
            api_key,
            model: model.to_string(),
            base_url: BASE_URL.to_string(),
        }
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }
}

/// Extractive question answering through the hosted inference API.
pub struct Client {
    http: reqwest::Client,
    config: Config,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl QuestionAnswerer for Client {
    async fn answer(&self, question: &str, context: &str) -> Result<QaAnswer> {
        let request = QaRequest {
            inputs: QaInputs { question, context },
        };
        let response: QaResponse = self
            .http
            .post(self.config.model_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .context("Failed to reach Hugging Face inference API")?
            .json()
            .await
            .context("Malformed question answering response")?;

        let answer = response.into_answer()?;
        tracing::debug!("QA answer {:?} with score {:.3}", answer.answer, answer.score);
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_nests_inputs() {
        let request = QaRequest {
            inputs: QaInputs {
                question: "When does it open?",
                context: "The library opens at 9am.",
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"inputs": {"question": "When does it open?", "context": "The library opens at 9am."}})
        );
    }

    #[test]
    fn test_answer_response() {
        let response: QaResponse = serde_json::from_value(json!({
            "score": 0.5,
            "start": 22,
            "end": 25,
            "answer": "9am"
        }))
        .unwrap();

        let answer = response.into_answer().unwrap();
        assert_eq!(answer.answer, "9am");
        assert_eq!(answer.score, 0.5);
    }

    #[test]
    fn test_error_response() {
        let response: QaResponse =
            serde_json::from_value(json!({"error": "Model is currently loading"})).unwrap();
        assert!(response.into_answer().is_err());
    }
}
