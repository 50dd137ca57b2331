//! Session orchestration for Inspectra
//!
//! The orchestrator ties the store, the gateway, and the asset directory
//! together: it creates and loads sessions, attaches images, and drives
//! the submit flow. The active session is an explicit `SessionContext`
//! value passed into every call; there is no ambient session state.

use crate::error::{InspectraError, Result};
use crate::gateway::{ChatMessage, Gateway, UsageMetrics};
use crate::personas::{compose_system_prompt, Persona};
use crate::storage::{SqliteStore, DEFAULT_TITLE};
use anyhow::Context;
use std::path::PathBuf;
use uuid::Uuid;

/// Handle to the active session
///
/// Carries the session id explicitly so every orchestrator call names the
/// session it operates on.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Identifier of the session this context refers to
    pub session_id: String,
}

/// Result of a submit call
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Rejected: the session has no image attached; nothing was appended
    NoImage,
    /// The assistant answered; both turns are persisted
    Answered {
        /// The assistant's reply text
        content: String,
        /// Usage metrics for the call
        usage: UsageMetrics,
    },
}

/// Drives the inspection conversation flow
///
/// Owns the persistence store, a gateway implementation, and the directory
/// where uploaded image assets live.
pub struct Orchestrator {
    store: SqliteStore,
    gateway: Box<dyn Gateway>,
    assets_dir: PathBuf,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `store` - The persistence store
    /// * `gateway` - Gateway implementation for AI calls
    /// * `assets_dir` - Directory for uploaded image assets (created if
    ///   missing)
    pub fn new(
        store: SqliteStore,
        gateway: Box<dyn Gateway>,
        assets_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let assets_dir = assets_dir.into();
        std::fs::create_dir_all(&assets_dir)
            .with_context(|| format!("Failed to create assets dir {}", assets_dir.display()))?;
        Ok(Self {
            store,
            gateway,
            assets_dir,
        })
    }

    /// Access the underlying store
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Allocate and persist a fresh session
    pub fn new_session(&self) -> Result<SessionContext> {
        let session_id = Uuid::new_v4().to_string();
        self.store
            .create_session(&session_id, DEFAULT_TITLE, Persona::default())?;
        tracing::info!("Created session {}", session_id);
        Ok(SessionContext { session_id })
    }

    /// Load an existing session
    ///
    /// # Errors
    ///
    /// Returns error if no session with this id exists
    pub fn open_session(&self, session_id: &str) -> Result<SessionContext> {
        self.store
            .get_session(session_id)?
            .ok_or_else(|| InspectraError::Storage(format!("Session {} not found", session_id)))?;
        Ok(SessionContext {
            session_id: session_id.to_string(),
        })
    }

    /// Attach an image to the session
    ///
    /// Validates that the bytes are a recognizable image, writes the asset
    /// as `<assets_dir>/<session_id>.<ext>`, and links it to the session.
    /// A previously attached asset under a different name is removed
    /// best-effort.
    ///
    /// # Errors
    ///
    /// Returns an image error for unrecognizable data, or a storage/io
    /// error if persisting fails
    pub fn upload_image(&self, ctx: &SessionContext, bytes: &[u8]) -> Result<PathBuf> {
        let format = image::guess_format(bytes)
            .map_err(|e| InspectraError::Image(format!("Unrecognized image data: {}", e)))?;
        let ext = format.extensions_str().first().copied().unwrap_or("img");

        let previous = self
            .store
            .get_session(&ctx.session_id)?
            .and_then(|s| s.image_path);

        let path = self.assets_dir.join(format!("{}.{}", ctx.session_id, ext));
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write image asset {}", path.display()))?;

        self.store
            .set_session_image(&ctx.session_id, &path.to_string_lossy())?;

        if let Some(old) = previous {
            if PathBuf::from(&old) != path && std::path::Path::new(&old).exists() {
                if let Err(e) = std::fs::remove_file(&old) {
                    tracing::warn!("Failed to remove replaced asset {}: {}", old, e);
                }
            }
        }

        tracing::info!(
            "Attached {} image to session {}",
            ext,
            ctx.session_id
        );
        Ok(path)
    }

    /// Change the session's analysis persona
    ///
    /// The persona gates the system prompt used for every subsequent
    /// submit in this session.
    pub fn select_mode(&self, ctx: &SessionContext, persona: Persona) -> Result<()> {
        self.store.set_session_mode(&ctx.session_id, persona)
    }

    /// Submit a question for the attached image
    ///
    /// Without an image the call is rejected as a no-op outcome the caller
    /// surfaces as a warning. Otherwise the user message is persisted, the
    /// gateway is called with the prior history and the composed system
    /// prompt, and on success the assistant message is persisted with its
    /// usage metrics. On failure nothing is appended for the assistant
    /// turn; the user message stands.
    pub async fn submit(
        &self,
        ctx: &SessionContext,
        question: &str,
        focus: Option<&str>,
    ) -> Result<SubmitOutcome> {
        let session = self
            .store
            .get_session(&ctx.session_id)?
            .ok_or_else(|| {
                InspectraError::Storage(format!("Session {} not found", ctx.session_id))
            })?;

        let Some(image_path) = session.image_path else {
            tracing::warn!(
                "Submit rejected: session {} has no image attached",
                ctx.session_id
            );
            return Ok(SubmitOutcome::NoImage);
        };

        // History as it stood before this turn
        let prior: Vec<ChatMessage> = self
            .store
            .get_history(&ctx.session_id)?
            .into_iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content,
            })
            .collect();

        self.store
            .append_message(&ctx.session_id, "user", question, None)?;

        let image_bytes = std::fs::read(&image_path)
            .with_context(|| format!("Failed to read image asset {}", image_path))?;
        let system_prompt = compose_system_prompt(session.mode, focus);

        let reply = self
            .gateway
            .send(question, Some(&image_bytes), &prior, &system_prompt)
            .await?;

        self.store.append_message(
            &ctx.session_id,
            "assistant",
            &reply.content,
            Some(&reply.usage),
        )?;

        Ok(SubmitOutcome::Answered {
            content: reply.content,
            usage: reply.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ChatReply;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

    /// Captured arguments from one gateway call
    struct CapturedCall {
        question: String,
        had_image: bool,
        history: Vec<ChatMessage>,
        system_prompt: String,
    }

    /// Gateway double: records calls, returns a canned reply or an error
    struct FakeGateway {
        reply_content: String,
        fail: bool,
        calls: Arc<Mutex<Vec<CapturedCall>>>,
    }

    impl FakeGateway {
        fn answering(content: &str) -> Self {
            Self {
                reply_content: content.to_string(),
                fail: false,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing() -> Self {
            Self {
                reply_content: String::new(),
                fail: true,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Handle to the recorded calls, usable after the gateway is boxed
        fn calls(&self) -> Arc<Mutex<Vec<CapturedCall>>> {
            self.calls.clone()
        }
    }

    #[async_trait]
    impl Gateway for FakeGateway {
        async fn send(
            &self,
            question: &str,
            image: Option<&[u8]>,
            history: &[ChatMessage],
            system_prompt: &str,
        ) -> Result<ChatReply> {
            self.calls.lock().unwrap().push(CapturedCall {
                question: question.to_string(),
                had_image: image.is_some(),
                history: history.to_vec(),
                system_prompt: system_prompt.to_string(),
            });
            if self.fail {
                return Err(InspectraError::Connection("simulated outage".to_string()).into());
            }
            Ok(ChatReply {
                content: self.reply_content.clone(),
                usage: UsageMetrics::from_counts(100, 50, 150, 2.0),
            })
        }
    }

    fn test_orchestrator(gateway: FakeGateway) -> (Orchestrator, tempfile::TempDir) {
        let dir = tempdir().expect("tempdir failed");
        let store =
            SqliteStore::new_with_path(dir.path().join("test.db")).expect("store failed");
        let orchestrator = Orchestrator::new(store, Box::new(gateway), dir.path().join("assets"))
            .expect("orchestrator failed");
        (orchestrator, dir)
    }

    #[test]
    fn test_new_session_persists_defaults() {
        let (orch, _dir) = test_orchestrator(FakeGateway::answering("ok"));
        let ctx = orch.new_session().expect("new session failed");

        let session = orch
            .store()
            .get_session(&ctx.session_id)
            .expect("get failed")
            .expect("session missing");
        assert_eq!(session.title, DEFAULT_TITLE);
        assert_eq!(session.mode, Persona::GeneralAnalysis);
        assert!(session.image_path.is_none());
    }

    #[test]
    fn test_new_sessions_get_unique_ids() {
        let (orch, _dir) = test_orchestrator(FakeGateway::answering("ok"));
        let a = orch.new_session().expect("a failed");
        let b = orch.new_session().expect("b failed");
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_open_session_missing_errors() {
        let (orch, _dir) = test_orchestrator(FakeGateway::answering("ok"));
        assert!(orch.open_session("no-such-id").is_err());
    }

    #[test]
    fn test_open_session_roundtrip() {
        let (orch, _dir) = test_orchestrator(FakeGateway::answering("ok"));
        let ctx = orch.new_session().expect("new failed");
        let reopened = orch.open_session(&ctx.session_id).expect("open failed");
        assert_eq!(reopened.session_id, ctx.session_id);
    }

    #[test]
    fn test_upload_image_writes_asset_and_links() {
        let (orch, _dir) = test_orchestrator(FakeGateway::answering("ok"));
        let ctx = orch.new_session().expect("new failed");

        let path = orch.upload_image(&ctx, PNG_MAGIC).expect("upload failed");
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "png");

        let session = orch
            .store()
            .get_session(&ctx.session_id)
            .expect("get failed")
            .unwrap();
        assert_eq!(session.image_path.as_deref(), path.to_str());
    }

    #[test]
    fn test_upload_image_rejects_non_image_data() {
        let (orch, _dir) = test_orchestrator(FakeGateway::answering("ok"));
        let ctx = orch.new_session().expect("new failed");
        assert!(orch.upload_image(&ctx, b"definitely not an image").is_err());
    }

    #[test]
    fn test_upload_replacement_removes_old_asset() {
        let (orch, _dir) = test_orchestrator(FakeGateway::answering("ok"));
        let ctx = orch.new_session().expect("new failed");

        let old = orch.upload_image(&ctx, PNG_MAGIC).expect("first upload failed");
        let new = orch.upload_image(&ctx, JPEG_MAGIC).expect("second upload failed");

        assert_ne!(old, new);
        assert!(!old.exists());
        assert!(new.exists());
    }

    #[tokio::test]
    async fn test_submit_without_image_is_rejected_noop() {
        let (orch, _dir) = test_orchestrator(FakeGateway::answering("ok"));
        let ctx = orch.new_session().expect("new failed");

        let outcome = orch
            .submit(&ctx, "What is this?", None)
            .await
            .expect("submit failed");
        assert!(matches!(outcome, SubmitOutcome::NoImage));

        // Nothing appended
        let history = orch
            .store()
            .get_history(&ctx.session_id)
            .expect("history failed");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_submit_persists_both_turns() {
        let (orch, _dir) = test_orchestrator(FakeGateway::answering("A worn bearing."));
        let ctx = orch.new_session().expect("new failed");
        orch.upload_image(&ctx, PNG_MAGIC).expect("upload failed");

        let outcome = orch
            .submit(&ctx, "Assess the damage", None)
            .await
            .expect("submit failed");

        match outcome {
            SubmitOutcome::Answered { content, usage } => {
                assert_eq!(content, "A worn bearing.");
                assert_eq!(usage.total_tokens, 150);
                assert_eq!(usage.throughput, 75.0);
            }
            other => panic!("Expected answer, got {:?}", other),
        }

        let history = orch
            .store()
            .get_history(&ctx.session_id)
            .expect("history failed");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[0].content, "Assess the damage");
        assert!(history[0].usage.is_none());
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[1].content, "A worn bearing.");
        assert_eq!(history[1].usage.unwrap().total_tokens, 150);
    }

    #[tokio::test]
    async fn test_submit_gateway_sees_image_and_composed_prompt() {
        let gateway = FakeGateway::answering("ok");
        let calls = gateway.calls();
        let (orch, _dir) = test_orchestrator(gateway);
        let ctx = orch.new_session().expect("new failed");
        orch.upload_image(&ctx, PNG_MAGIC).expect("upload failed");

        orch.submit(&ctx, "Check for rust", Some("focus on the rim"))
            .await
            .expect("submit failed");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.question, "Check for rust");
        assert!(call.had_image);
        assert!(call.history.is_empty());
        // Persona base, then guardrail, then focus
        let base = call.system_prompt.find("Senior Technical Engineer").unwrap();
        let guard = call
            .system_prompt
            .find("CRITICAL OPERATIONAL PROTOCOL")
            .unwrap();
        let focus = call.system_prompt.find("focus on the rim").unwrap();
        assert!(base < guard && guard < focus);
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_user_message_only() {
        let (orch, _dir) = test_orchestrator(FakeGateway::failing());
        let ctx = orch.new_session().expect("new failed");
        orch.upload_image(&ctx, PNG_MAGIC).expect("upload failed");

        let result = orch.submit(&ctx, "Assess the damage", None).await;
        assert!(result.is_err());

        let history = orch
            .store()
            .get_history(&ctx.session_id)
            .expect("history failed");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[0].content, "Assess the damage");
    }

    #[tokio::test]
    async fn test_submit_passes_prior_history_in_order() {
        let gateway = FakeGateway::answering("an answer");
        let calls = gateway.calls();
        let (orch, _dir) = test_orchestrator(gateway);
        let ctx = orch.new_session().expect("new failed");
        orch.upload_image(&ctx, PNG_MAGIC).expect("upload failed");

        orch.submit(&ctx, "first question", None)
            .await
            .expect("first submit failed");
        orch.submit(&ctx, "second question", None)
            .await
            .expect("second submit failed");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        // First call saw an empty history; second saw the first exchange
        assert!(calls[0].history.is_empty());
        assert_eq!(calls[1].history.len(), 2);
        assert_eq!(calls[1].history[0], ChatMessage::user("first question"));
        assert_eq!(calls[1].history[1], ChatMessage::assistant("an answer"));

        let history = orch
            .store()
            .get_history(&ctx.session_id)
            .expect("history failed");
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn test_select_mode_gates_system_prompt() {
        let gateway = FakeGateway::answering("ok");
        let calls = gateway.calls();
        let (orch, _dir) = test_orchestrator(gateway);
        let ctx = orch.new_session().expect("new failed");
        orch.upload_image(&ctx, PNG_MAGIC).expect("upload failed");

        orch.select_mode(&ctx, Persona::SafetyAudit)
            .expect("select mode failed");

        let session = orch
            .store()
            .get_session(&ctx.session_id)
            .expect("get failed")
            .unwrap();
        assert_eq!(session.mode, Persona::SafetyAudit);

        orch.submit(&ctx, "Audit this", None)
            .await
            .expect("submit failed");

        let calls = calls.lock().unwrap();
        assert!(calls[0].system_prompt.contains("HSE Safety Officer"));
        assert!(!calls[0].system_prompt.contains("Senior Technical Engineer"));
    }

    #[tokio::test]
    async fn test_first_submit_auto_renames_session() {
        let (orch, _dir) = test_orchestrator(FakeGateway::answering("ok"));
        let ctx = orch.new_session().expect("new failed");
        orch.upload_image(&ctx, PNG_MAGIC).expect("upload failed");

        orch.submit(&ctx, "Check the bearing for wear please, it squeaks loudly", None)
            .await
            .expect("submit failed");

        let session = orch
            .store()
            .get_session(&ctx.session_id)
            .expect("get failed")
            .unwrap();
        assert_eq!(session.title, "Check the bearing for wear ple...");
    }
}
