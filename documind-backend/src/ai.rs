//! Gateway to the external text-generation provider.
//!
//! All three operations are single-shot request/response calls with no
//! internal retry; callers decide whether a failure is fatal (explicit
//! analyze/generate/chat) or best-effort (upload-time analysis).

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;
use utoipa::ToSchema;

use crate::error::Error;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Documents longer than this are truncated before analysis.
const MAX_ANALYZE_CHARS: usize = 8000;

const SYSTEM_PROMPT: &str = "You are DocuMind, an AI assistant specialized in document processing, analysis, and generation.

Your capabilities include:
1. Analyzing documents to extract key information, themes, and insights
2. Summarizing documents of various types and lengths
3. Generating professional documents based on user requirements
4. Answering questions about document structure, formatting, and best practices
5. Providing guidance on documentation standards and templates

When responding to users:
- Be helpful, professional, and concise
- Provide specific, actionable advice
- When generating or analyzing documents, follow industry best practices
- If you don't know something, admit it rather than making up information
- For document generation, ask clarifying questions if the user's requirements are vague

Always maintain a helpful, professional tone.";

const ANALYZE_SYSTEM_PROMPT: &str = "You are an expert document analyzer. Extract key information, summarize content, and identify main themes.";

const GENERATE_SYSTEM_PROMPT: &str = "You are an expert document creator. Generate professional, well-structured documents based on user requirements.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Seam between the orchestrator and the external provider; tests substitute
/// a stub implementation.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Free-form conversation about documents.
    async fn chat_respond(&self, messages: &[ChatMessage]) -> Result<String, Error>;

    /// Structured analysis of document text.
    async fn analyze(&self, content: &str) -> Result<String, Error>;

    /// Generate a complete markdown document from a short brief.
    async fn generate(
        &self,
        document_type: &str,
        title: &str,
        description: &str,
    ) -> Result<String, Error>;
}

/// Ensure the conversation carries the DocuMind persona: prepend the system
/// instruction unless the caller supplied their own.
fn with_system_prompt(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut formatted = Vec::with_capacity(messages.len() + 1);
    if !messages.iter().any(|m| m.role == "system") {
        formatted.push(ChatMessage::system(SYSTEM_PROMPT));
    }
    formatted.extend(messages.iter().cloned());
    formatted
}

/// Cap analysis input, marking the cut with an ellipsis.
fn truncate_for_analysis(content: &str) -> Cow<'_, str> {
    if content.chars().count() <= MAX_ANALYZE_CHARS {
        return Cow::Borrowed(content);
    }
    let mut truncated: String = content.chars().take(MAX_ANALYZE_CHARS).collect();
    truncated.push_str("...");
    Cow::Owned(truncated)
}

fn analysis_prompt(content: &str) -> String {
    format!(
        "Analyze the following document and provide:\n\
         1. A brief summary (3-5 sentences)\n\
         2. Key points (bullet points)\n\
         3. Main themes or topics\n\
         4. Any action items or next steps mentioned\n\
         \n\
         Document content:\n{}",
        truncate_for_analysis(content)
    )
}

fn generation_prompt(document_type: &str, title: &str, description: &str) -> String {
    format!(
        "Create a {document_type} document with the title \"{title}\" based on the following description:\n\
         \n\
         {description}\n\
         \n\
         Generate a complete, professional document with appropriate sections, formatting, and content.\n\
         Format the response in Markdown."
    )
}

// ========== OpenAI-compatible client ==========

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Deserialize)]
struct ProviderErrorResponse {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

pub struct OpenAiClient {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(endpoint: Url, model: String, api_key: Option<String>) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| Error::Configuration(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
        })
    }

    /// Read provider configuration once at startup. A missing credential is
    /// logged here and reported as a `Configuration` error on first use.
    pub fn from_env() -> Result<Self, Error> {
        let endpoint = std::env::var("DOCUMIND_OPENAI_URL")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let endpoint = Url::parse(&endpoint)
            .map_err(|err| Error::Configuration(format!("Invalid provider URL: {err}")))?;

        let model =
            std::env::var("DOCUMIND_OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let api_key = std::env::var("DOCUMIND_OPENAI_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|key| !key.is_empty());
        if api_key.is_none() {
            warn!("No AI provider API key configured, AI endpoints will be unavailable");
        }

        Self::new(endpoint, model, api_key)
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, Error> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::Configuration("API key is not set".to_string()))?;

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
        };

        debug!(
            "Requesting completion: {} messages, max_tokens={}",
            messages.len(),
            max_tokens
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::Gateway(format!("Request failed: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| Error::Gateway(format!("Failed to read response: {err}")))?;

        if !status.is_success() {
            // Prefer the provider's own error message when the body parses
            let message = match serde_json::from_str::<ProviderErrorResponse>(&body) {
                Ok(parsed) => parsed.error.message,
                Err(_) => format!("HTTP {status}: {body}"),
            };
            return Err(Error::Gateway(message));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|err| Error::Gateway(format!("Malformed provider response: {err}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Gateway("Provider returned no choices".to_string()))
    }
}

#[async_trait]
impl AiGateway for OpenAiClient {
    async fn chat_respond(&self, messages: &[ChatMessage]) -> Result<String, Error> {
        let formatted = with_system_prompt(messages);
        self.complete(&formatted, 0.7, 1000).await
    }

    async fn analyze(&self, content: &str) -> Result<String, Error> {
        let messages = [
            ChatMessage::system(ANALYZE_SYSTEM_PROMPT),
            ChatMessage::user(analysis_prompt(content)),
        ];
        self.complete(&messages, 0.5, 1000).await
    }

    async fn generate(
        &self,
        document_type: &str,
        title: &str,
        description: &str,
    ) -> Result<String, Error> {
        let messages = [
            ChatMessage::system(GENERATE_SYSTEM_PROMPT),
            ChatMessage::user(generation_prompt(document_type, title, description)),
        ];
        self.complete(&messages, 0.7, 2000).await
    }
}
