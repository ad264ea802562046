//! Per-turn orchestration saga.
//!
//! One [`SessionOrchestrator`] drives a single conversation. A turn moves
//! through explicit phases (`Idle → Composing → Dispatching → AwaitingAnswer
//! → Persisting → Idle`); a new submission is rejected while a turn is in
//! flight, so uploads, the ask call, and persistence for one conversation are
//! strictly sequential. Staged attachments are snapshotted and cleared before
//! any network call, so a rapid duplicate submission cannot resend them.
//!
//! Failure policy per turn: an attachment upload failure is logged and the
//! turn continues with degraded context; an ask failure aborts the turn with
//! a fixed fallback message and persists nothing; a persistence failure is
//! reported distinctly since the caller has already seen the answer.

use crate::ApiClient;
use anyhow::Result;
use async_trait::async_trait;
use docsage_core::models::{
    clamp_history, ChatHistoryEntry, ChatResponse, SaveTurnRequest,
};
use std::sync::Arc;
use uuid::Uuid;

/// Shown in place of an answer when the engine fails; nothing is persisted
/// for such a turn.
pub const FALLBACK_ANSWER: &str =
    "Sorry, something went wrong while answering. Please check that the assistant service is running and try again.";

/// A file selected for upload but not yet sent or linked to any conversation.
/// Lives only in orchestrator state between composition and dispatch.
#[derive(Debug, Clone)]
pub struct StagedAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Where the current turn is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Composing,
    Dispatching,
    AwaitingAnswer,
    Persisting,
}

/// Everything the saga needs from the outside world. [`ApiClient`] is the
/// production implementation; tests substitute their own.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Reserve an empty conversation id (no messages yet).
    async fn reserve_conversation(&self, title: &str) -> Result<Uuid>;

    /// Upload one attachment, tagged with its conversation.
    async fn upload_attachment(
        &self,
        conversation_id: Uuid,
        attachment: &StagedAttachment,
    ) -> Result<()>;

    /// Dispatch the question with bounded trailing history.
    async fn ask(
        &self,
        question: &str,
        conversation_id: Option<Uuid>,
        history: Vec<ChatHistoryEntry>,
    ) -> Result<ChatResponse>;

    /// Persist the user/assistant pair; returns the conversation id (newly
    /// created when the request carried none).
    async fn save_turn(&self, request: &SaveTurnRequest) -> Result<Uuid>;
}

#[async_trait]
impl<B: ChatBackend + ?Sized> ChatBackend for Arc<B> {
    async fn reserve_conversation(&self, title: &str) -> Result<Uuid> {
        (**self).reserve_conversation(title).await
    }

    async fn upload_attachment(
        &self,
        conversation_id: Uuid,
        attachment: &StagedAttachment,
    ) -> Result<()> {
        (**self).upload_attachment(conversation_id, attachment).await
    }

    async fn ask(
        &self,
        question: &str,
        conversation_id: Option<Uuid>,
        history: Vec<ChatHistoryEntry>,
    ) -> Result<ChatResponse> {
        (**self).ask(question, conversation_id, history).await
    }

    async fn save_turn(&self, request: &SaveTurnRequest) -> Result<Uuid> {
        (**self).save_turn(request).await
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn reserve_conversation(&self, title: &str) -> Result<Uuid> {
        let response = ApiClient::reserve_conversation(self, title).await?;
        Ok(response.conversation_id)
    }

    async fn upload_attachment(
        &self,
        conversation_id: Uuid,
        attachment: &StagedAttachment,
    ) -> Result<()> {
        self.upload_document(
            &attachment.filename,
            attachment.content.clone(),
            false,
            Some(conversation_id),
        )
        .await?;
        Ok(())
    }

    async fn ask(
        &self,
        question: &str,
        conversation_id: Option<Uuid>,
        history: Vec<ChatHistoryEntry>,
    ) -> Result<ChatResponse> {
        ApiClient::ask(self, question, conversation_id, history).await
    }

    async fn save_turn(&self, request: &SaveTurnRequest) -> Result<Uuid> {
        let response = ApiClient::save_turn(self, request).await?;
        Ok(response.conversation_id)
    }
}

/// Why a submission was rejected before any work happened.
#[derive(Debug, PartialEq, Eq)]
pub enum TurnError {
    /// A turn is already in flight for this conversation.
    Busy,
    /// The question was empty after trimming.
    EmptyQuestion,
}

impl std::fmt::Display for TurnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnError::Busy => write!(f, "A turn is already in flight"),
            TurnError::EmptyQuestion => write!(f, "Question must not be empty"),
        }
    }
}

impl std::error::Error for TurnError {}

/// How a dispatched turn resolved.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Answer received and the full turn persisted. `failed_uploads` names
    /// attachments that did not index; their absence degrades context but
    /// does not fail the turn.
    Answered {
        conversation_id: Uuid,
        response: ChatResponse,
        failed_uploads: Vec<String>,
    },
    /// The engine failed; show `FALLBACK_ANSWER`. Nothing was persisted and
    /// no retry happens automatically.
    AnswerFailed { fallback: &'static str },
    /// Answer received but persistence failed; the caller has seen the
    /// answer, the store has not.
    PersistFailed {
        response: ChatResponse,
        failed_uploads: Vec<String>,
    },
}

/// Drives one conversation, one turn at a time.
pub struct SessionOrchestrator<B: ChatBackend> {
    backend: B,
    conversation_id: Option<Uuid>,
    phase: TurnPhase,
    staged: Vec<StagedAttachment>,
    /// Local transcript mirror, source of the trailing-context window.
    history: Vec<ChatHistoryEntry>,
}

impl<B: ChatBackend> SessionOrchestrator<B> {
    /// Start a fresh conversation; the id is assigned on the first turn.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            conversation_id: None,
            phase: TurnPhase::Idle,
            staged: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Resume an existing conversation with its transcript.
    pub fn resume(backend: B, conversation_id: Uuid, history: Vec<ChatHistoryEntry>) -> Self {
        Self {
            backend,
            conversation_id: Some(conversation_id),
            phase: TurnPhase::Idle,
            staged: Vec::new(),
            history,
        }
    }

    pub fn conversation_id(&self) -> Option<Uuid> {
        self.conversation_id
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != TurnPhase::Idle
    }

    /// Stage an attachment for the next submission.
    pub fn stage_attachment(&mut self, filename: impl Into<String>, content: Vec<u8>) {
        self.staged.push(StagedAttachment {
            filename: filename.into(),
            content,
        });
    }

    pub fn staged_attachments(&self) -> &[StagedAttachment] {
        &self.staged
    }

    #[cfg(test)]
    fn force_phase(&mut self, phase: TurnPhase) {
        self.phase = phase;
    }

    /// Run one full turn: upload staged attachments, ask, persist the pair.
    pub async fn submit(&mut self, question: &str) -> Result<TurnOutcome, TurnError> {
        if self.phase != TurnPhase::Idle {
            return Err(TurnError::Busy);
        }
        let question = question.trim().to_string();
        if question.is_empty() {
            return Err(TurnError::EmptyQuestion);
        }

        // Snapshot and clear staged state before the first await so a
        // duplicate submission cannot resend the same attachments.
        self.phase = TurnPhase::Composing;
        let staged = std::mem::take(&mut self.staged);

        // Uploads must carry a conversation id; reserve one if this is the
        // first turn and attachments are staged. The reservation writes no
        // placeholder message.
        if self.conversation_id.is_none() && !staged.is_empty() {
            match self.backend.reserve_conversation(&question).await {
                Ok(id) => self.conversation_id = Some(id),
                Err(err) => {
                    tracing::error!(error = %err, "Failed to reserve conversation for attachments");
                    self.phase = TurnPhase::Idle;
                    return Ok(TurnOutcome::AnswerFailed {
                        fallback: FALLBACK_ANSWER,
                    });
                }
            }
        }

        self.phase = TurnPhase::Dispatching;
        let mut failed_uploads = Vec::new();
        if !staged.is_empty() {
            // Invariant from the reservation above: an id exists here.
            let conversation_id = match self.conversation_id {
                Some(id) => id,
                None => {
                    self.phase = TurnPhase::Idle;
                    return Ok(TurnOutcome::AnswerFailed {
                        fallback: FALLBACK_ANSWER,
                    });
                }
            };
            // Sequential on purpose: bounded backend load, deterministic
            // linkage order.
            for attachment in &staged {
                if let Err(err) = self
                    .backend
                    .upload_attachment(conversation_id, attachment)
                    .await
                {
                    tracing::warn!(
                        filename = %attachment.filename,
                        error = %err,
                        "Attachment upload failed; continuing with degraded context"
                    );
                    failed_uploads.push(attachment.filename.clone());
                }
            }
        }

        self.phase = TurnPhase::AwaitingAnswer;
        let window = clamp_history(&self.history).to_vec();
        let response = match self
            .backend
            .ask(&question, self.conversation_id, window)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "Question dispatch failed; turn aborted");
                self.phase = TurnPhase::Idle;
                return Ok(TurnOutcome::AnswerFailed {
                    fallback: FALLBACK_ANSWER,
                });
            }
        };

        self.phase = TurnPhase::Persisting;
        let attachments: Vec<String> = staged.iter().map(|a| a.filename.clone()).collect();
        let request = SaveTurnRequest {
            conversation_id: self.conversation_id,
            user_message: question.clone(),
            assistant_message: response.answer.clone(),
            attachments: (!attachments.is_empty()).then_some(attachments),
            sources: (!response.sources.is_empty()).then(|| response.sources.clone()),
        };

        let outcome = match self.backend.save_turn(&request).await {
            Ok(conversation_id) => {
                self.conversation_id = Some(conversation_id);
                TurnOutcome::Answered {
                    conversation_id,
                    response: response.clone(),
                    failed_uploads,
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to persist turn");
                TurnOutcome::PersistFailed {
                    response: response.clone(),
                    failed_uploads,
                }
            }
        };

        // The caller saw the answer either way; mirror it locally so the
        // next turn's context window includes it.
        self.history.push(ChatHistoryEntry {
            role: "user".to_string(),
            content: question,
        });
        self.history.push(ChatHistoryEntry {
            role: "assistant".to_string(),
            content: response.answer,
        });

        self.phase = TurnPhase::Idle;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsage_core::models::RetrievalSource;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct AskCall {
        question: String,
        conversation_id: Option<Uuid>,
        history: Vec<ChatHistoryEntry>,
    }

    #[derive(Default)]
    struct MockBackend {
        reserve_count: Mutex<u32>,
        reserved_id: Mutex<Option<Uuid>>,
        uploads: Mutex<Vec<(Uuid, String)>>,
        asks: Mutex<Vec<AskCall>>,
        saves: Mutex<Vec<SaveTurnRequest>>,
        fail_uploads: Mutex<HashSet<String>>,
        fail_ask: AtomicBool,
        fail_save: AtomicBool,
    }

    impl MockBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn fail_upload_of(&self, filename: &str) {
            self.fail_uploads.lock().unwrap().insert(filename.to_string());
        }

        fn answer() -> ChatResponse {
            ChatResponse {
                answer: "The contract renews annually.".to_string(),
                sources: vec![RetrievalSource {
                    filename: "contract.pdf".to_string(),
                    chunk_index: 3,
                    similarity: 0.91,
                }],
                confidence: 0.88,
            }
        }
    }

    #[async_trait]
    impl ChatBackend for MockBackend {
        async fn reserve_conversation(&self, _title: &str) -> Result<Uuid> {
            let id = Uuid::new_v4();
            *self.reserve_count.lock().unwrap() += 1;
            *self.reserved_id.lock().unwrap() = Some(id);
            Ok(id)
        }

        async fn upload_attachment(
            &self,
            conversation_id: Uuid,
            attachment: &StagedAttachment,
        ) -> Result<()> {
            if self
                .fail_uploads
                .lock()
                .unwrap()
                .contains(&attachment.filename)
            {
                return Err(anyhow::anyhow!("index refused the file"));
            }
            self.uploads
                .lock()
                .unwrap()
                .push((conversation_id, attachment.filename.clone()));
            Ok(())
        }

        async fn ask(
            &self,
            question: &str,
            conversation_id: Option<Uuid>,
            history: Vec<ChatHistoryEntry>,
        ) -> Result<ChatResponse> {
            self.asks.lock().unwrap().push(AskCall {
                question: question.to_string(),
                conversation_id,
                history,
            });
            if self.fail_ask.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("engine unreachable"));
            }
            Ok(Self::answer())
        }

        async fn save_turn(&self, request: &SaveTurnRequest) -> Result<Uuid> {
            self.saves.lock().unwrap().push(request.clone());
            if self.fail_save.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("store unavailable"));
            }
            Ok(request.conversation_id.unwrap_or_else(Uuid::new_v4))
        }
    }

    #[tokio::test]
    async fn first_turn_without_attachments_creates_lazily() {
        let backend = MockBackend::new();
        let mut orchestrator = SessionOrchestrator::new(backend.clone());

        let outcome = orchestrator.submit("What is the renewal term?").await.unwrap();

        // No eager reservation when nothing needs tagging
        assert_eq!(*backend.reserve_count.lock().unwrap(), 0);
        let saves = backend.saves.lock().unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].conversation_id, None);
        assert!(matches!(outcome, TurnOutcome::Answered { .. }));
        assert!(orchestrator.conversation_id().is_some());
        assert_eq!(orchestrator.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn attachments_force_eager_reservation_and_tagged_uploads() {
        let backend = MockBackend::new();
        let mut orchestrator = SessionOrchestrator::new(backend.clone());
        orchestrator.stage_attachment("contract.pdf", b"fake pdf".to_vec());

        let outcome = orchestrator.submit("Summarize the contract").await.unwrap();

        assert_eq!(*backend.reserve_count.lock().unwrap(), 1);
        let reserved = backend.reserved_id.lock().unwrap().unwrap();
        let uploads = backend.uploads.lock().unwrap();
        assert_eq!(uploads.as_slice(), &[(reserved, "contract.pdf".to_string())]);

        // The reserved id is finalized, not duplicated, by the first save
        let saves = backend.saves.lock().unwrap();
        assert_eq!(saves[0].conversation_id, Some(reserved));
        match outcome {
            TurnOutcome::Answered {
                conversation_id, ..
            } => assert_eq!(conversation_id, reserved),
            other => panic!("expected Answered, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn upload_failure_is_non_fatal_and_turn_persists_fully() {
        let backend = MockBackend::new();
        backend.fail_upload_of("broken.pdf");
        let mut orchestrator = SessionOrchestrator::new(backend.clone());
        orchestrator.stage_attachment("good.pdf", b"a".to_vec());
        orchestrator.stage_attachment("broken.pdf", b"b".to_vec());

        let outcome = orchestrator.submit("Compare the two files").await.unwrap();

        match outcome {
            TurnOutcome::Answered { failed_uploads, .. } => {
                assert_eq!(failed_uploads, vec!["broken.pdf".to_string()]);
            }
            other => panic!("expected Answered, got {:?}", other),
        }
        // The answer was still requested and the complete pair saved
        assert_eq!(backend.asks.lock().unwrap().len(), 1);
        let saves = backend.saves.lock().unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(
            saves[0].attachments,
            Some(vec!["good.pdf".to_string(), "broken.pdf".to_string()])
        );
    }

    #[tokio::test]
    async fn ask_failure_persists_nothing_and_shows_fallback() {
        let backend = MockBackend::new();
        backend.fail_ask.store(true, Ordering::SeqCst);
        let mut orchestrator = SessionOrchestrator::new(backend.clone());

        let outcome = orchestrator.submit("Anyone there?").await.unwrap();

        match outcome {
            TurnOutcome::AnswerFailed { fallback } => assert_eq!(fallback, FALLBACK_ANSWER),
            other => panic!("expected AnswerFailed, got {:?}", other),
        }
        assert!(backend.saves.lock().unwrap().is_empty());
        assert_eq!(orchestrator.phase(), TurnPhase::Idle);

        // A retry submission is a fresh turn, not a replay
        backend.fail_ask.store(false, Ordering::SeqCst);
        let outcome = orchestrator.submit("Anyone there?").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Answered { .. }));
        // Failed turn left no trace in the context window
        let asks = backend.asks.lock().unwrap();
        assert!(asks[1].history.is_empty());
    }

    #[tokio::test]
    async fn duplicate_submission_cannot_resend_attachments() {
        let backend = MockBackend::new();
        backend.fail_ask.store(true, Ordering::SeqCst);
        let mut orchestrator = SessionOrchestrator::new(backend.clone());
        orchestrator.stage_attachment("once.pdf", b"x".to_vec());

        orchestrator.submit("First").await.unwrap();
        assert_eq!(backend.uploads.lock().unwrap().len(), 1);

        // Staged state was cleared before dispatch; resubmitting uploads nothing
        backend.fail_ask.store(false, Ordering::SeqCst);
        orchestrator.submit("Second").await.unwrap();
        assert_eq!(backend.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn persist_failure_is_reported_distinctly() {
        let backend = MockBackend::new();
        backend.fail_save.store(true, Ordering::SeqCst);
        let mut orchestrator = SessionOrchestrator::new(backend.clone());

        let outcome = orchestrator.submit("Will this save?").await.unwrap();

        match outcome {
            TurnOutcome::PersistFailed { response, .. } => {
                assert_eq!(response.answer, MockBackend::answer().answer);
            }
            other => panic!("expected PersistFailed, got {:?}", other),
        }
        assert_eq!(orchestrator.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn busy_orchestrator_rejects_submission() {
        let backend = MockBackend::new();
        let mut orchestrator = SessionOrchestrator::new(backend);
        orchestrator.force_phase(TurnPhase::AwaitingAnswer);

        let err = orchestrator.submit("Too eager").await.unwrap_err();
        assert_eq!(err, TurnError::Busy);
    }

    #[tokio::test]
    async fn empty_question_is_rejected_before_any_call() {
        let backend = MockBackend::new();
        let mut orchestrator = SessionOrchestrator::new(backend.clone());

        let err = orchestrator.submit("   ").await.unwrap_err();
        assert_eq!(err, TurnError::EmptyQuestion);
        assert!(backend.asks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_window_holds_three_most_recent_turns() {
        let backend = MockBackend::new();
        let mut orchestrator = SessionOrchestrator::new(backend.clone());

        for i in 0..5 {
            orchestrator.submit(&format!("Question {}", i)).await.unwrap();
        }

        let asks = backend.asks.lock().unwrap();
        // Fifth ask sees four prior turns locally but only six messages travel
        let last = asks.last().unwrap();
        assert_eq!(last.history.len(), 6);
        assert_eq!(last.history[0].content, "Question 1");
        assert_eq!(last.history[0].role, "user");
        assert_eq!(last.history[5].role, "assistant");
    }

    #[tokio::test]
    async fn later_turns_reuse_the_conversation_id() {
        let backend = MockBackend::new();
        let mut orchestrator = SessionOrchestrator::new(backend.clone());

        orchestrator.submit("First").await.unwrap();
        let id = orchestrator.conversation_id().unwrap();
        orchestrator.submit("Second").await.unwrap();

        let saves = backend.saves.lock().unwrap();
        assert_eq!(saves[1].conversation_id, Some(id));
        let asks = backend.asks.lock().unwrap();
        assert_eq!(asks[1].conversation_id, Some(id));
    }
}
