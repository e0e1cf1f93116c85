use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use fundy_agent::chat::{ChatEngine, ChatError};
use fundy_core::config::RagConfig;

use crate::memory::TranscriptBuffer;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

/// HTTP client for the knowledge service's chat endpoint.
///
/// One client owns one conversation: the transcript lives here and is
/// replayed to the service on every request, so the service itself stays
/// stateless from our point of view. A failed request leaves the
/// transcript untouched.
pub struct RagClient {
    http: Client,
    base_url: String,
    model: String,
    system_prompt: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
    transcript: Mutex<TranscriptBuffer>,
}

impl RagClient {
    pub fn from_config(config: &RagConfig) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ChatError::Unreachable(error.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
            transcript: Mutex::new(TranscriptBuffer::new(config.history_chars)),
        })
    }

    /// Cheap reachability probe used by `fundy doctor`.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn build_messages(&self, transcript: &TranscriptBuffer, query: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(transcript.len() * 2 + 2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage { role: "system", content: self.system_prompt.clone() });
        }
        for turn in transcript.turns() {
            messages.push(ChatMessage { role: "user", content: turn.query.clone() });
            messages.push(ChatMessage { role: "assistant", content: turn.reply.clone() });
        }
        messages.push(ChatMessage { role: "user", content: query.to_string() });
        messages
    }

    async fn post_chat(&self, messages: Vec<ChatMessage>) -> Result<String, ChatError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest { model: &self.model, messages, stream: false };

        let mut builder = self.http.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                ChatError::Timeout(self.timeout_secs)
            } else if error.is_connect() {
                ChatError::Unreachable(error.to_string())
            } else {
                ChatError::Api(error.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| ChatError::Decode(error.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiError>(&body)
                .map(|api| api.error)
                .unwrap_or_else(|_| format!("status {status}"));
            return Err(ChatError::Api(detail));
        }

        parse_reply(&body)
    }
}

fn parse_reply(body: &str) -> Result<String, ChatError> {
    serde_json::from_str::<ChatResponse>(body)
        .map(|response| response.message.content)
        .map_err(|error| ChatError::Decode(error.to_string()))
}

#[async_trait]
impl ChatEngine for RagClient {
    async fn respond(&self, query: &str) -> Result<String, ChatError> {
        let mut transcript = self.transcript.lock().await;
        let messages = self.build_messages(&transcript, query);

        debug!(
            event_name = "rag.request.sent",
            model = %self.model,
            messages = messages.len(),
            "querying the knowledge service"
        );

        let reply = self.post_chat(messages).await?;
        transcript.record(query, reply.clone());
        Ok(reply)
    }
}
