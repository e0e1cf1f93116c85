use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

/// Failures surfaced by a conversational front-end.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("knowledge service unreachable: {0}")]
    Unreachable(String),
    #[error("knowledge service request failed: {0}")]
    Api(String),
    #[error("knowledge service reply could not be decoded: {0}")]
    Decode(String),
    #[error("knowledge service timed out after {0}s")]
    Timeout(u64),
}

/// Text-in/text-out seam to the knowledge service.
///
/// Implementations own their conversational memory and whatever retrieval
/// machinery sits behind them; callers only ever see the reply string.
#[async_trait]
pub trait ChatEngine: Send + Sync {
    async fn respond(&self, query: &str) -> Result<String, ChatError>;
}

/// Deterministic engine that plays back canned replies, for tests and
/// offline demos. Once the script runs out every call fails, which doubles
/// as the front-end outage fixture.
#[derive(Default)]
pub struct ScriptedChatEngine {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedChatEngine {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { replies: Mutex::new(replies.into_iter().map(Into::into).collect()) }
    }
}

#[async_trait]
impl ChatEngine for ScriptedChatEngine {
    async fn respond(&self, _query: &str) -> Result<String, ChatError> {
        let next = match self.replies.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.ok_or_else(|| ChatError::Api("scripted replies exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_engine_plays_replies_in_order() {
        let engine = ScriptedChatEngine::new(["first", "second"]);
        assert_eq!(engine.respond("hi").await.unwrap(), "first");
        assert_eq!(engine.respond("again").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn exhausted_script_fails_like_an_outage() {
        let engine = ScriptedChatEngine::default();
        assert!(engine.respond("hi").await.is_err());
    }
}
