use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use fundy_core::domain::order::OrderRecord;
use fundy_core::ledger::Ledger;
use fundy_store::OrderStore;

use crate::chat::ChatEngine;
use crate::extract::{ProjectResolution, RequestExtractor};

/// Structured result of one assistant turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestOutcome {
    /// Amount fits the budget and the order store acknowledged the write.
    Approved { project_id: String, project_name: String, amount: u64 },
    Denied { project_name: String, amount: u64 },
    /// The budget check passed but the order could not be recorded. Not
    /// an approval: nothing was persisted.
    RecordFailed { project_name: String, amount: u64 },
    NeedsClarification { candidates: Vec<String> },
    Unrecognized,
}

impl RequestOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Approved { .. } => "approved",
            Self::Denied { .. } => "denied",
            Self::RecordFailed { .. } => "record_failed",
            Self::NeedsClarification { .. } => "needs_clarification",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// The line shown to the requesting employee.
    pub fn user_message(&self) -> String {
        match self {
            Self::Approved { project_name, amount, .. } => {
                format!("Request approved: {amount} riyals for project {project_name}.")
            }
            Self::Denied { project_name, amount } => {
                format!(
                    "Request denied: {amount} riyals exceeds the budget for project {project_name}."
                )
            }
            Self::RecordFailed { project_name, amount } => {
                format!(
                    "Your request of {amount} riyals for project {project_name} passed the \
                     budget check but could not be recorded. Please try again."
                )
            }
            Self::NeedsClarification { candidates } => {
                format!("Which project did you mean: {}?", candidates.join(", "))
            }
            Self::Unrecognized => {
                "Could not understand the project name/ID or amount.".to_string()
            }
        }
    }
}

/// Everything one call to [`AssistantRuntime::handle_utterance`] produced.
#[derive(Clone, Debug, Serialize)]
pub struct TurnReport {
    pub correlation_id: String,
    /// Display reply from the front-end, absent when it is disabled or down.
    pub reply: Option<String>,
    pub outcome: RequestOutcome,
}

/// Orchestrates one employee utterance: narrate, extract, validate, record.
///
/// The front-end reply and the structured outcome are computed
/// independently from the same raw text; a front-end outage degrades the
/// reply to `None` and never blocks the structured path.
pub struct AssistantRuntime {
    ledger: Arc<Ledger>,
    chat: Option<Arc<dyn ChatEngine>>,
    orders: Arc<dyn OrderStore>,
    extractor: RequestExtractor,
}

impl AssistantRuntime {
    pub fn new(
        ledger: Arc<Ledger>,
        chat: Option<Arc<dyn ChatEngine>>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self { ledger, chat, orders, extractor: RequestExtractor::new() }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub async fn handle_utterance(&self, text: &str) -> TurnReport {
        let correlation_id = Uuid::new_v4().to_string();

        let reply = match &self.chat {
            Some(engine) => match engine.respond(text).await {
                Ok(reply) => Some(reply),
                Err(error) => {
                    warn!(
                        event_name = "assistant.front_end.failed",
                        correlation_id = %correlation_id,
                        %error,
                        "front-end reply unavailable; structured path continues"
                    );
                    None
                }
            },
            None => None,
        };

        let request = self.extractor.extract(text, &self.ledger);
        let outcome = self.decide(request.project, request.amount, &correlation_id).await;

        info!(
            event_name = "assistant.turn.completed",
            correlation_id = %correlation_id,
            outcome = outcome.kind(),
            "utterance handled"
        );

        TurnReport { correlation_id, reply, outcome }
    }

    async fn decide(
        &self,
        resolution: ProjectResolution,
        amount: Option<u64>,
        correlation_id: &str,
    ) -> RequestOutcome {
        let project = match resolution {
            ProjectResolution::Unique(id) => match self.ledger.resolve(&id.0) {
                Some(project) => project,
                None => return RequestOutcome::Unrecognized,
            },
            ProjectResolution::Ambiguous(ids) => {
                let candidates = ids
                    .iter()
                    .map(|id| {
                        self.ledger
                            .resolve(&id.0)
                            .map(|project| project.name.clone())
                            .unwrap_or_else(|| id.0.clone())
                    })
                    .collect();
                return RequestOutcome::NeedsClarification { candidates };
            }
            ProjectResolution::None => return RequestOutcome::Unrecognized,
        };

        let Some(amount) = amount else {
            return RequestOutcome::Unrecognized;
        };

        if !project.within_budget(amount) {
            info!(
                event_name = "assistant.request.denied",
                correlation_id,
                project_id = %project.id,
                amount,
                "requested amount exceeds the project budget"
            );
            return RequestOutcome::Denied { project_name: project.name.clone(), amount };
        }

        let record = OrderRecord::new(project, amount);
        match self.orders.append(&record).await {
            Ok(()) => {
                info!(
                    event_name = "assistant.request.approved",
                    correlation_id,
                    project_id = %project.id,
                    amount,
                    "order recorded"
                );
                RequestOutcome::Approved {
                    project_id: project.id.0.clone(),
                    project_name: project.name.clone(),
                    amount,
                }
            }
            Err(error) => {
                warn!(
                    event_name = "assistant.request.record_failed",
                    correlation_id,
                    project_id = %project.id,
                    amount,
                    %error,
                    "budget check passed but the order write failed"
                );
                RequestOutcome::RecordFailed { project_name: project.name.clone(), amount }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ScriptedChatEngine;
    use fundy_core::ledger::parse_registry;
    use fundy_store::{InMemoryOrderStore, OrderStore};

    const REGISTRY: &str = "\
- Project ID: 7 | Name: Alpha | Budget: 200 Riyals
- Project ID: 223 | Name: Tools | Budget: 8000 Riyals
";

    fn runtime_with(store: Arc<InMemoryOrderStore>) -> AssistantRuntime {
        let ledger = Arc::new(parse_registry(REGISTRY).ledger);
        AssistantRuntime::new(ledger, None, store)
    }

    #[tokio::test]
    async fn within_budget_request_is_approved_and_recorded() {
        let store = Arc::new(InMemoryOrderStore::new());
        let runtime = runtime_with(store.clone());

        let report = runtime.handle_utterance("Send 100 to alpha").await;

        assert_eq!(report.outcome.kind(), "approved");
        let message = report.outcome.user_message();
        assert!(message.contains("alpha"));
        assert!(message.contains("100"));

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].project_id, "7");
        assert_eq!(records[0].project_name, "alpha");
        assert_eq!(records[0].amount, 100);
    }

    #[tokio::test]
    async fn request_spending_the_exact_budget_is_approved() {
        let store = Arc::new(InMemoryOrderStore::new());
        let runtime = runtime_with(store.clone());

        let report = runtime.handle_utterance("Send 200 to alpha").await;
        assert_eq!(report.outcome.kind(), "approved");
    }

    #[tokio::test]
    async fn over_budget_request_is_denied_and_not_recorded() {
        let store = Arc::new(InMemoryOrderStore::new());
        let runtime = runtime_with(store.clone());

        let report = runtime.handle_utterance("Send 1000 to alpha").await;

        assert_eq!(report.outcome.kind(), "denied");
        assert!(report.outcome.user_message().contains("alpha"));
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn failed_write_is_not_announced_as_approved() {
        let store = Arc::new(InMemoryOrderStore::failing());
        let runtime = runtime_with(store.clone());

        let report = runtime.handle_utterance("Send 100 to alpha").await;

        assert_eq!(report.outcome.kind(), "record_failed");
        let message = report.outcome.user_message();
        assert!(!message.starts_with("Request approved"));
        assert!(message.contains("could not be recorded"));
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn unintelligible_request_gets_the_generic_message() {
        let runtime = runtime_with(Arc::new(InMemoryOrderStore::new()));

        let report = runtime.handle_utterance("What is the leave policy?").await;

        assert_eq!(report.outcome.kind(), "unrecognized");
        assert_eq!(
            report.outcome.user_message(),
            "Could not understand the project name/ID or amount."
        );
    }

    #[tokio::test]
    async fn two_matched_projects_ask_for_clarification() {
        let store = Arc::new(InMemoryOrderStore::new());
        let runtime = runtime_with(store.clone());

        let report = runtime.handle_utterance("Take 50 from alpha or tools").await;

        assert_eq!(report.outcome.kind(), "needs_clarification");
        let message = report.outcome.user_message();
        assert!(message.contains("alpha"));
        assert!(message.contains("tools"));
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn front_end_reply_is_passed_through() {
        let ledger = Arc::new(parse_registry(REGISTRY).ledger);
        let chat = Arc::new(ScriptedChatEngine::new(["Happy to help."]));
        let runtime = AssistantRuntime::new(ledger, Some(chat), Arc::new(InMemoryOrderStore::new()));

        let report = runtime.handle_utterance("Hello there").await;
        assert_eq!(report.reply.as_deref(), Some("Happy to help."));
    }

    #[tokio::test]
    async fn front_end_outage_does_not_block_the_structured_path() {
        let ledger = Arc::new(parse_registry(REGISTRY).ledger);
        let store = Arc::new(InMemoryOrderStore::new());
        let chat = Arc::new(ScriptedChatEngine::default());
        let runtime = AssistantRuntime::new(ledger, Some(chat), store.clone());

        let report = runtime.handle_utterance("Send 100 to alpha").await;

        assert_eq!(report.reply, None);
        assert_eq!(report.outcome.kind(), "approved");
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn empty_ledger_never_approves() {
        let runtime = AssistantRuntime::new(
            Arc::new(Ledger::default()),
            None,
            Arc::new(InMemoryOrderStore::new()),
        );

        let report = runtime.handle_utterance("Send 100 to alpha").await;
        assert_eq!(report.outcome.kind(), "unrecognized");
    }

    #[tokio::test]
    async fn in_memory_store_lists_recorded_orders() {
        let store = Arc::new(InMemoryOrderStore::new());
        let runtime = runtime_with(store.clone());

        runtime.handle_utterance("Send 100 to alpha").await;
        runtime.handle_utterance("Send 500 to tools").await;

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].project_id, "223");
    }
}
