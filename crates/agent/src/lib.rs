//! Assistant runtime - deterministic fund-request handling around a
//! conversational front-end
//!
//! This crate is the decision core of fundy:
//! - Pulls a structured fund request out of free-form text (`extract`)
//! - Validates amounts against the project ledger and records approved
//!   orders (`runtime`)
//! - Reaches the knowledge service through a single text-in/text-out
//!   seam (`chat`)
//!
//! # Architecture
//!
//! Every utterance walks one linear path:
//! 1. **Narration** (`chat`) - the front-end produces a display reply
//! 2. **Extraction** (`extract`) - tokenize, match projects, find the amount
//! 3. **Validation** - budget check against the ledger
//! 4. **Recording** (`fundy-store`) - append the approved order
//!
//! # Safety Principle
//!
//! The front-end is strictly a narrator. It NEVER approves, denies, or
//! records anything. The structured path re-reads the raw utterance and
//! decides deterministically, and an approval is only announced once the
//! order store has acknowledged the write.

pub mod chat;
pub mod extract;
pub mod runtime;

pub use chat::{ChatEngine, ChatError, ScriptedChatEngine};
pub use extract::{FundRequest, ProjectResolution, RequestExtractor};
pub use runtime::{AssistantRuntime, RequestOutcome, TurnReport};
