use crate::answer::AnswerService;
use crate::error::AnswerError;
use crate::storage::PersistenceAdapter;
use crate::store::{ConversationStore, SessionState, Transcript};
use tracing::{error, info, warn};

/// Proof that a request is in flight.
///
/// Only one exists at a time and it cannot be cloned, so whoever holds it
/// settles the request exactly once.
#[derive(Debug)]
pub struct PendingAnswer {
    question: String,
}

impl PendingAnswer {
    /// The raw, untrimmed question to send.
    pub fn question(&self) -> &str {
        &self.question
    }
}

/// Why a submission was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Another request is still in flight
    Pending,
    /// Nothing but whitespace
    Blank,
}

/// What `submit` did with a question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Answered(String),
    Failed,
    Dropped(DropReason),
}

/// Serializes questions to the answering service and records every outcome
/// in the transcript.
///
/// States are `Idle` and `Pending`; `begin` moves Idle to Pending and
/// `settle` moves back, always appending exactly one assistant message.
pub struct AnswerOrchestrator {
    store: ConversationStore,
    persistence: PersistenceAdapter,
    failure_message: String,
}

impl AnswerOrchestrator {
    /// Restore the previous transcript (or the greeting) and start idle.
    pub fn restore(persistence: PersistenceAdapter, failure_message: impl Into<String>) -> Self {
        let transcript = persistence.restore();
        Self {
            store: ConversationStore::new(transcript),
            persistence,
            failure_message: failure_message.into(),
        }
    }

    /// Accept a question if idle and non-blank.
    ///
    /// Appends the user message, clears the draft and marks the session
    /// pending. Returns `Err` with the reason when the submission is dropped;
    /// nothing is mutated in that case.
    pub fn begin(&mut self, question: &str) -> Result<PendingAnswer, DropReason> {
        if self.store.is_pending() {
            info!("dropping submission while a request is in flight");
            return Err(DropReason::Pending);
        }

        if question.trim().is_empty() {
            return Err(DropReason::Blank);
        }

        self.store
            .append_user(question)
            .map_err(|_| DropReason::Blank)?;
        self.sync();

        self.store.clear_draft();
        self.store.set_pending(true);

        Ok(PendingAnswer {
            question: question.to_string(),
        })
    }

    /// Record the outcome of the request for `ticket` and return to idle.
    pub fn settle(&mut self, ticket: PendingAnswer, outcome: Result<String, AnswerError>) {
        match outcome {
            Ok(answer) => {
                self.store.append_assistant(answer);
            }
            Err(err) => {
                error!(error = %err, question = %ticket.question, "error fetching answer");
                self.store.append_assistant(self.failure_message.clone());
            }
        }
        self.sync();
        self.store.set_pending(false);
    }

    /// Run a full submission: `begin`, call the service, `settle`.
    pub async fn submit<A>(&mut self, service: &A, question: &str) -> SubmitOutcome
    where
        A: AnswerService + ?Sized,
    {
        let ticket = match self.begin(question) {
            Ok(ticket) => ticket,
            Err(reason) => return SubmitOutcome::Dropped(reason),
        };

        let outcome = service.ask(ticket.question()).await;
        let result = match &outcome {
            Ok(answer) => SubmitOutcome::Answered(answer.clone()),
            Err(_) => SubmitOutcome::Failed,
        };
        self.settle(ticket, outcome);
        result
    }

    pub fn is_pending(&self) -> bool {
        self.store.is_pending()
    }

    pub fn transcript(&self) -> &Transcript {
        self.store.transcript()
    }

    pub fn snapshot(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn draft(&self) -> &str {
        self.store.draft()
    }

    pub fn draft_mut(&mut self) -> &mut String {
        self.store.draft_mut()
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.store.set_draft(text);
    }

    /// Best-effort write; a failure never rolls back the in-memory transcript.
    fn sync(&self) {
        if let Err(err) = self.persistence.persist(self.store.transcript()) {
            warn!(error = %err, "failed to persist transcript");
        }
    }
}
