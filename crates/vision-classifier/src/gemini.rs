//! Gemini `generateContent` client

use async_trait::async_trait;
use frame_capture::EncodedFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::prompt::{SYSTEM_INSTRUCTION, USER_INSTRUCTION};
use crate::verdict::{parse_verdict, RiskVerdict};
use crate::{Classifier, ClassifierError};

/// Environment variable holding the model credential
pub const API_KEY_ENV: &str = "API_KEY";

/// Longest error body kept in a `ClassifierError::Status`
const MAX_ERROR_BODY: usize = 512;

/// Classifier client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Model identifier
    pub model: String,
    /// API base URL (without the `/models/...` path)
    pub endpoint: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// The single static credential. Resolved once at startup.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Read `API_KEY` from the process environment
    pub fn from_env() -> Result<Self, ClassifierError> {
        Self::from_value(std::env::var(API_KEY_ENV).ok())
    }

    pub fn from_value(value: Option<String>) -> Result<Self, ClassifierError> {
        match value.map(|v| v.trim().to_string()) {
            Some(key) if !key.is_empty() => Ok(Self(key)),
            _ => Err(ClassifierError::MissingCredential(API_KEY_ENV)),
        }
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Gemini vision client. One POST per frame, no retries.
pub struct GeminiClient {
    config: ClassifierConfig,
    credential: Credential,
    http: reqwest::Client,
    url: String,
}

impl GeminiClient {
    pub fn new(config: ClassifierConfig, credential: Credential) -> Result<Self, ClassifierError> {
        if config.model.trim().is_empty() {
            return Err(ClassifierError::InvalidConfig("model id is empty".to_string()));
        }
        let endpoint = config.endpoint.trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ClassifierError::InvalidConfig(format!(
                "endpoint must be an http(s) URL: {}",
                config.endpoint
            )));
        }
        let url = format!("{}/models/{}:generateContent", endpoint, config.model);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClassifierError::InvalidConfig(e.to_string()))?;

        info!("Classifier client ready: model={} endpoint={}", config.model, endpoint);

        Ok(Self {
            config,
            credential,
            http,
            url,
        })
    }

    /// Resolve the credential from the environment and build the client
    pub fn from_env(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let credential = Credential::from_env()?;
        Self::new(config, credential)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn request_body(frame: &EncodedFrame) -> GenerateContentRequest<'static> {
        GenerateContentRequest {
            system_instruction: Content {
                parts: vec![Part::Text {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            contents: vec![Content {
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: frame.mime_type(),
                            data: frame.to_base64(),
                        },
                    },
                    Part::Text {
                        text: USER_INSTRUCTION,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        }
    }
}

#[async_trait]
impl Classifier for GeminiClient {
    async fn classify(&self, frame: &EncodedFrame) -> Result<RiskVerdict, ClassifierError> {
        let start = Instant::now();
        let body = Self::request_body(frame);

        debug!(
            "Classifying frame #{} ({} bytes, {}x{})",
            frame.sequence,
            frame.bytes.len(),
            frame.width,
            frame.height
        );

        let response = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(
                body.char_indices()
                    .nth(MAX_ERROR_BODY)
                    .map(|(i, _)| i)
                    .unwrap_or(body.len()),
            );
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Envelope(e.to_string()))?;
        let text = envelope
            .text()
            .ok_or_else(|| ClassifierError::Envelope("no candidate text in response".to_string()))?;

        let verdict = parse_verdict(&text);
        debug!(
            "Verdict for frame #{}: {} ({:.2}) in {}ms",
            frame.sequence,
            verdict.kind(),
            verdict.confidence(),
            start.elapsed().as_millis()
        );
        Ok(verdict)
    }
}
