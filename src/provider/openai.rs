use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{ChatProvider, ImageProvider};
use crate::errors::{ArtefactError, Result};
use crate::wire::{ChatRequest, ImageRequest};

/// Chat and image client for the OpenAI HTTP API.
pub struct OpenAiClient {
    api_key: String,
    api_base: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(api_key: &str, api_base: &str, timeout_secs: u64) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(ArtefactError::MissingCredential);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ArtefactError::Provider(format!("http client: {e}")))?;
        Ok(Self {
            api_key: api_key.trim().to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = self.endpoint(path);
        let start = Instant::now();
        tracing::debug!(%url, "POST");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ArtefactError::Provider(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ArtefactError::Provider(format!("read body failed: {e}")))?;
        tracing::info!(%url, %status, elapsed_ms = start.elapsed().as_millis() as u64, "OpenAI response");

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ArtefactError::RateLimited(text));
        }
        if !status.is_success() {
            return Err(ArtefactError::Provider(format!("OpenAI API error ({status}): {text}")));
        }

        serde_json::from_str(&text).map_err(|e| {
            ArtefactError::InvalidResponse(format!("failed to parse OpenAI response: {e}\nRaw: {text}"))
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    #[serde(default)]
    url: Option<String>,
}

fn first_content(parsed: ChatResponse) -> Result<String> {
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ArtefactError::InvalidResponse("OpenAI response had no choices".into()))
}

fn image_urls(parsed: ImagesResponse) -> Result<Vec<String>> {
    let urls: Vec<String> = parsed.data.into_iter().filter_map(|d| d.url).collect();
    if urls.is_empty() {
        return Err(ArtefactError::InvalidResponse("OpenAI returned no image URLs".into()));
    }
    Ok(urls)
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, req: &ChatRequest) -> Result<String> {
        tracing::info!(model = %req.model, messages = req.messages.len(), "chat completion");
        let parsed: ChatResponse = self.post("chat/completions", req).await?;
        first_content(parsed)
    }
}

#[async_trait]
impl ImageProvider for OpenAiClient {
    async fn generate(&self, req: &ImageRequest) -> Result<Vec<String>> {
        tracing::info!(model = %req.model, size = %req.size, "image generation");
        let parsed: ImagesResponse = self.post("images/generations", req).await?;
        image_urls(parsed)
    }
}
