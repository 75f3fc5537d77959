//! Google Gemini client for AI-generated question explanations.

use crate::providers::json::parse_json_with_context;
use crate::providers::{GeneratedSolution, GenerationError, QuestionContext, SolutionGenerator};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Upstream error bodies are truncated to this many characters.
const MAX_ERROR_BODY: usize = 500;

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    /// Build a client. A missing API key is allowed; every call then fails
    /// with [`GenerationError::NotConfigured`].
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        url::Url::parse(base_url).with_context(|| format!("Invalid Gemini base URL: {base_url}"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Gemini HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Tutor prompt: the question, optional subject, and the sections we want back.
pub fn build_prompt(question: &QuestionContext) -> String {
    let mut prompt = format!(
        "You are an expert academic tutor helping students understand exam questions.\n\n\
         Question: {}\n",
        question.text.trim()
    );
    if let Some(subject) = question.subject.as_deref().filter(|s| !s.trim().is_empty()) {
        prompt.push_str(&format!("\nSubject: {}", subject.trim()));
    }
    prompt.push_str(
        "\n\nPlease provide:\n\
         1. A clear, step-by-step solution\n\
         2. Key concepts involved\n\
         3. Common mistakes to avoid\n\
         4. Tips for exam preparation\n\n\
         Format your response in a clear, structured manner suitable for students.",
    );
    prompt
}

#[async_trait]
impl SolutionGenerator for GeminiClient {
    async fn generate(
        &self,
        question: &QuestionContext,
    ) -> Result<GeneratedSolution, GenerationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerationError::NotConfigured);
        };

        let prompt = build_prompt(question);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::from_reqwest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(GenerationError::from_reqwest)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Gemini request rejected");
            return Err(match status.as_u16() {
                429 => GenerationError::QuotaExhausted,
                408 | 504 => GenerationError::Timeout,
                code => GenerationError::Upstream {
                    status: code,
                    body: text.chars().take(MAX_ERROR_BODY).collect(),
                },
            });
        }

        let parsed: GenerateContentResponse =
            parse_json_with_context(&text).map_err(GenerationError::Malformed)?;

        let solution = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if solution.trim().is_empty() {
            return Err(GenerationError::Malformed(
                "no text in any candidate".to_owned(),
            ));
        }

        debug!(
            prompt_length = prompt.len(),
            response_length = solution.len(),
            "Gemini solution generated"
        );

        Ok(GeneratedSolution {
            text: solution,
            model: parsed.model_version.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, key: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            &server.uri(),
            key.map(str::to_owned),
            "gemini-pro",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn prompt_includes_subject_when_known() {
        let question = QuestionContext::new("What is TCP?").with_subject("Computer Networks");
        let prompt = build_prompt(&question);
        assert!(prompt.contains("Question: What is TCP?"));
        assert!(prompt.contains("Subject: Computer Networks"));
        assert!(prompt.contains("Common mistakes to avoid"));

        let bare = build_prompt(&QuestionContext::new("What is TCP?"));
        assert!(!bare.contains("Subject:"));
    }

    #[tokio::test]
    async fn joins_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-pro:generateContent"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "TCP is " }, { "text": "reliable." }] } }],
                "modelVersion": "gemini-pro-001"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let solution = client(&server, Some("secret"))
            .generate(&QuestionContext::new("What is TCP?"))
            .await
            .unwrap();
        assert_eq!(solution.text, "TCP is reliable.");
        assert_eq!(solution.model, "gemini-pro-001");
    }

    #[tokio::test]
    async fn missing_key_never_calls_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, None)
            .generate(&QuestionContext::new("What is TCP?"))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::NotConfigured);
    }

    #[tokio::test]
    async fn maps_rate_limit_and_empty_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let gemini = client(&server, Some("secret"));
        let question = QuestionContext::new("What is TCP?");
        assert_eq!(
            gemini.generate(&question).await.unwrap_err(),
            GenerationError::QuotaExhausted
        );
        assert!(matches!(
            gemini.generate(&question).await.unwrap_err(),
            GenerationError::Malformed(_)
        ));
    }
}
