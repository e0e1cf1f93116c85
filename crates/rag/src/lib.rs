//! Knowledge-service integration - the conversational front-end
//!
//! fundy never runs retrieval, embeddings, or generation itself. This
//! crate holds the one HTTP client that talks to the external knowledge
//! service (an Ollama-compatible chat endpoint) and the bounded transcript
//! that gives the service conversational context. Everything behind the
//! HTTP boundary is the service's own concern.

pub mod client;
pub mod memory;

pub use client::RagClient;
pub use memory::{TranscriptBuffer, Turn};
