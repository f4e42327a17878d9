use std::fmt;

use async_trait::async_trait;
use lm_core::{Error, FailureKind, InferenceModel, Invocation, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::Config;

const TEMPERATURE: f32 = 0.5;
const TOP_P: f32 = 0.8;
const RESPONSE_MIME_TYPE: &str = "application/json";
const DANGEROUS_CONTENT: &str = "HARM_CATEGORY_DANGEROUS_CONTENT";
const BLOCK_ONLY_HIGH: &str = "BLOCK_ONLY_HIGH";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    response_mime_type: &'static str,
}

#[derive(Serialize, Debug)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(Error::upstream(
                format!("Gemini returned no content ({})", reason),
                FailureKind::Terminal,
            ));
        };

        Ok(candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

/// Invoker for Google's generative language API.
pub struct GeminiModel {
    client: Client,
    config: Config,
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

impl GeminiModel {
    pub fn new(config: Config) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            Error::Configuration(format!("Invalid Gemini base URL '{}': {}", config.base_url, e))
        })?;
        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    fn api_key<'a>(&'a self, invocation: &'a Invocation) -> Result<&'a str> {
        non_empty(invocation.api_key.as_deref())
            .or_else(|| non_empty(self.config.api_key.as_deref()))
            .ok_or_else(|| Error::Configuration("Missing GEMINI_API_KEY environment variable.".to_string()))
    }

    fn model_name<'a>(&'a self, invocation: &'a Invocation) -> &'a str {
        non_empty(invocation.model.as_deref()).unwrap_or(&self.config.model_name)
    }

    /// Bare names live under `models/`; `models/...` or `tunedModels/...` are used as given.
    fn endpoint(&self, model: &str) -> Result<Url> {
        let resource = if model.contains('/') {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        let url = format!(
            "{}/v1beta/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            resource
        );
        Url::parse(&url).map_err(|e| Error::Configuration(format!("Invalid Gemini endpoint '{}': {}", url, e)))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn describe_error(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorBody {
                message: Some(message),
                status,
            },
        }) => match status {
            Some(status) => format!("{} ({})", message, status),
            None => message,
        },
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl InferenceModel for GeminiModel {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn complete(&self, invocation: &Invocation) -> Result<String> {
        let api_key = self.api_key(invocation)?;
        let model = self.model_name(invocation);
        let endpoint = self.endpoint(model)?;
        info!(model = %model, "📋 Using Gemini model");

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: &invocation.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                response_mime_type: RESPONSE_MIME_TYPE,
            },
            safety_settings: vec![SafetySetting {
                category: DANGEROUS_CONTENT,
                threshold: BLOCK_ONLY_HIGH,
            }],
        };

        let response = self
            .client
            .post(endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::upstream_message(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::upstream_message(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            let kind = FailureKind::from_status(status.as_u16(), &body);
            debug!(status = status.as_u16(), ?kind, "Gemini answered with an error");
            return Err(Error::upstream(
                format!("[{}] {}", status, describe_error(&body)),
                kind,
            ));
        }

        let decoded: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            Error::upstream(
                format!("Failed to decode Gemini response: {}", e),
                FailureKind::Terminal,
            )
        })?;
        decoded.into_text()
    }
}
