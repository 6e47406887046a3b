//! The conversation pipeline: input → encode → submit → append result.
//!
//! A submission moves `Idle → Pending → Idle`. The `begin_*` methods validate
//! input, append the user's entry and return the request to dispatch;
//! [`Pipeline::settle`] appends the single reply (or error) and returns to
//! idle. Front ends with an event loop run the dispatch in the background and
//! call `settle` when it finishes; everything else can use the `submit_*`
//! methods, which do all three steps.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{Rejection, RemoteError, UploadError};
use crate::message::{Conversation, FileDescriptor, Message};
use crate::remote::{Remote, RemoteRequest, SubmissionKind};
use crate::upload::{read_upload, DEFAULT_MAX_UPLOAD_BYTES};

#[derive(Debug)]
pub struct Pipeline<R> {
    conversation: Conversation,
    remote: Arc<R>,
    pending: bool,
    max_upload_bytes: u64,
}

impl<R: Remote> Pipeline<R> {
    pub fn new(remote: R) -> Self {
        Self {
            conversation: Conversation::new(),
            remote: Arc::new(remote),
            pending: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Accept a typed question. Blank input and submissions while pending are
    /// rejected without touching the conversation.
    pub fn begin_text(&mut self, text: &str) -> Result<RemoteRequest, Rejection> {
        if text.trim().is_empty() {
            return Err(Rejection::Empty);
        }
        self.ensure_idle()?;

        self.conversation.push_with(|id| Message::user_text(id, text));
        self.pending = true;

        Ok(RemoteRequest {
            data: text.to_string(),
            kind: SubmissionKind::Text,
        })
    }

    /// Accept a file upload. Validation and read failures are appended as an
    /// `error` entry and reported as [`Rejection::Invalid`]; pending is never
    /// set for them.
    pub async fn begin_file(&mut self, path: &Path) -> Result<RemoteRequest, Rejection> {
        self.ensure_idle()?;

        let encoded = match read_upload(path, self.max_upload_bytes).await {
            Ok(encoded) => encoded,
            Err(err) => {
                let declared = match &err {
                    UploadError::UnsupportedType { declared } => declared.as_deref(),
                    _ => None,
                };
                warn!(path = %path.display(), ?declared, error = %err, "upload refused");
                self.conversation
                    .push_with(|id| Message::error(id, err.to_string()));
                return Err(Rejection::Invalid);
            }
        };

        let descriptor = FileDescriptor {
            name: encoded.name,
            timestamp: Utc::now(),
        };
        self.conversation
            .push_with(|id| Message::user_file(id, descriptor));
        self.pending = true;

        Ok(RemoteRequest {
            data: encoded.data_uri,
            kind: encoded.media_type.kind(),
        })
    }

    /// The remote call for `request`, detached from `self` so it can be spawned.
    pub fn dispatch(
        &self,
        request: RemoteRequest,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send + 'static {
        let remote = Arc::clone(&self.remote);
        async move {
            info!(
                kind = request.kind.as_str(),
                bytes = request.data.len(),
                "submitting to remote endpoint"
            );
            remote.send(&request).await
        }
    }

    /// Record the outcome of the in-flight request and return to idle.
    ///
    /// Returns the appended entry, or `None` when nothing was pending.
    pub fn settle(&mut self, outcome: Result<String, RemoteError>) -> Option<&Message> {
        if !self.pending {
            warn!("settle called with no request in flight; ignoring");
            return None;
        }
        self.pending = false;

        let message = match outcome {
            Ok(response) => {
                info!(chars = response.len(), "remote answered");
                self.conversation
                    .push_with(|id| Message::assistant(id, response))
            }
            Err(err) => {
                warn!(error = %err, "submission failed");
                self.conversation
                    .push_with(|id| Message::error(id, format!("Error: {err}")))
            }
        };
        Some(message)
    }

    /// Submit text and wait for the reply.
    pub async fn submit_text(&mut self, text: &str) -> Result<&Message, Rejection> {
        let request = self.begin_text(text)?;
        let outcome = self.dispatch(request).await;
        self.settle(outcome).ok_or(Rejection::Pending)
    }

    /// Submit a file and wait for the reply.
    pub async fn submit_file(&mut self, path: &Path) -> Result<&Message, Rejection> {
        let request = self.begin_file(path).await?;
        let outcome = self.dispatch(request).await;
        self.settle(outcome).ok_or(Rejection::Pending)
    }

    fn ensure_idle(&self) -> Result<(), Rejection> {
        if self.pending {
            warn!("submission rejected: a request is already in flight");
            return Err(Rejection::Pending);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Content, Role};
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Answers from a script and records every request it receives.
    #[derive(Default)]
    struct ScriptedRemote {
        outcomes: Mutex<VecDeque<Result<String, RemoteError>>>,
        calls: Mutex<Vec<RemoteRequest>>,
    }

    impl ScriptedRemote {
        fn answering(outcomes: Vec<Result<String, RemoteError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::default(),
            }
        }

        fn calls(&self) -> Vec<RemoteRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Remote for ScriptedRemote {
        fn send(
            &self,
            request: &RemoteRequest,
        ) -> impl Future<Output = Result<String, RemoteError>> + Send {
            self.calls.lock().unwrap().push(request.clone());
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(RemoteError::Status(503)));
            async move { outcome }
        }
    }

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(contents)
            .unwrap();
        path
    }

    #[tokio::test]
    async fn test_text_round_trip() {
        let mut pipeline = Pipeline::new(ScriptedRemote::answering(vec![Ok("4".to_string())]));

        let reply = pipeline.submit_text("What is 2+2?").await.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content.as_text(), Some("4"));

        let conversation = pipeline.conversation();
        assert_eq!(conversation.len(), 2);
        let first = conversation.get(0).unwrap();
        assert_eq!(first.role, Role::User);
        assert_eq!(first.content.as_text(), Some("What is 2+2?"));

        assert_eq!(
            pipeline.remote().calls(),
            vec![RemoteRequest {
                data: "What is 2+2?".to_string(),
                kind: SubmissionKind::Text,
            }]
        );
        assert!(!pipeline.is_pending());
    }

    #[tokio::test]
    async fn test_server_error_becomes_error_entry() {
        let mut pipeline = Pipeline::new(ScriptedRemote::answering(vec![Err(
            RemoteError::Status(500),
        )]));

        pipeline.submit_text("What is 2+2?").await.unwrap();

        let conversation = pipeline.conversation();
        assert_eq!(conversation.len(), 2);
        let second = conversation.get(1).unwrap();
        assert_eq!(second.role, Role::Error);
        let text = second.content.as_text().unwrap();
        assert_eq!(text, "Error: Server responded with 500");
        assert!(text.contains("500"));
    }

    #[tokio::test]
    async fn test_blank_text_is_ignored() {
        let mut pipeline = Pipeline::new(ScriptedRemote::default());

        for input in ["", "   ", "\n\t "] {
            assert_eq!(pipeline.submit_text(input).await.unwrap_err(), Rejection::Empty);
        }

        assert!(pipeline.conversation().is_empty());
        assert!(pipeline.remote().calls().is_empty());
        assert!(!pipeline.is_pending());
    }

    #[tokio::test]
    async fn test_untrimmed_text_is_kept() {
        let mut pipeline = Pipeline::new(ScriptedRemote::answering(vec![Ok("ok".to_string())]));
        pipeline.submit_text("  two sum  ").await.unwrap();

        let first = pipeline.conversation().get(0).unwrap();
        assert_eq!(first.content.as_text(), Some("  two sum  "));
        assert_eq!(pipeline.remote().calls()[0].data, "  two sum  ");
    }

    #[test]
    fn test_second_submission_while_pending_is_rejected() {
        let mut pipeline = Pipeline::new(ScriptedRemote::default());

        pipeline.begin_text("first").unwrap();
        assert!(pipeline.is_pending());
        assert_eq!(pipeline.begin_text("second").unwrap_err(), Rejection::Pending);
        assert_eq!(pipeline.conversation().len(), 1);

        pipeline.settle(Ok("done".to_string())).unwrap();
        assert!(!pipeline.is_pending());
        assert!(pipeline.begin_text("second").is_ok());
    }

    #[test]
    fn test_settle_while_idle_appends_nothing() {
        let mut pipeline = Pipeline::new(ScriptedRemote::default());
        assert!(pipeline.settle(Ok("stray".to_string())).is_none());
        assert!(pipeline.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_upload_never_calls_remote() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "notes.txt", b"2+2");
        let mut pipeline = Pipeline::new(ScriptedRemote::default());

        assert_eq!(pipeline.submit_file(&path).await.unwrap_err(), Rejection::Invalid);

        let conversation = pipeline.conversation();
        assert_eq!(conversation.len(), 1);
        let only = conversation.get(0).unwrap();
        assert_eq!(only.role, Role::Error);
        assert_eq!(
            only.content.as_text(),
            Some("Please upload a PDF or image file (JPG/PNG)")
        );
        assert!(pipeline.remote().calls().is_empty());
        assert!(!pipeline.is_pending());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "scan.pdf", &[7u8; 100]);
        let mut pipeline = Pipeline::new(ScriptedRemote::default()).with_max_upload_bytes(10);

        assert_eq!(pipeline.submit_file(&path).await.unwrap_err(), Rejection::Invalid);
        assert_eq!(pipeline.conversation().len(), 1);
        assert_eq!(pipeline.conversation().get(0).unwrap().role, Role::Error);
        assert!(pipeline.remote().calls().is_empty());
    }

    #[tokio::test]
    async fn test_image_upload_appends_descriptor_then_reply() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "tree.png", b"\x89PNG");
        let mut pipeline = Pipeline::new(ScriptedRemote::answering(vec![Ok(
            "It's a binary tree".to_string(),
        )]));

        let request = pipeline.begin_file(&path).await.unwrap();
        assert_eq!(request.kind, SubmissionKind::Image);
        assert!(request.data.starts_with("data:image/png;base64,"));

        // The descriptor is in place before anything is dispatched
        assert_eq!(pipeline.conversation().len(), 1);
        assert!(pipeline.remote().calls().is_empty());
        let upload = pipeline.conversation().get(0).unwrap();
        assert_eq!(upload.role, Role::User);
        assert!(matches!(&upload.content, Content::File(f) if f.name == "tree.png"));

        let outcome = pipeline.dispatch(request).await;
        pipeline.settle(outcome).unwrap();

        assert_eq!(pipeline.remote().calls().len(), 1);
        assert_eq!(pipeline.conversation().len(), 2);
        assert_eq!(pipeline.conversation().get(1).unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_pdf_upload_is_sent_as_application() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "problem.pdf", b"%PDF-1.4");
        let mut pipeline = Pipeline::new(ScriptedRemote::answering(vec![Err(
            RemoteError::Status(502),
        )]));

        pipeline.submit_file(&path).await.unwrap();

        let calls = pipeline.remote().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, SubmissionKind::Application);
        assert!(calls[0].data.starts_with("data:application/pdf;base64,"));

        let last = pipeline.conversation().last().unwrap();
        assert_eq!(last.role, Role::Error);
        assert_eq!(last.content.as_text(), Some("Error: Server responded with 502"));
    }

    #[tokio::test]
    async fn test_pipeline_recovers_after_failure() {
        let mut pipeline = Pipeline::new(ScriptedRemote::answering(vec![
            Err(RemoteError::Status(500)),
            Ok("second try".to_string()),
        ]));

        pipeline.submit_text("a").await.unwrap();
        let reply = pipeline.submit_text("a").await.unwrap();
        assert_eq!(reply.content.as_text(), Some("second try"));

        let roles: Vec<Role> = pipeline.conversation().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Error, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_dispatch_can_be_spawned() {
        let mut pipeline = Pipeline::new(ScriptedRemote::answering(vec![Ok("4".to_string())]));

        let request = pipeline.begin_text("What is 2+2?").unwrap();
        let task = tokio::spawn(pipeline.dispatch(request));
        let outcome = task.await.unwrap();

        let reply = pipeline.settle(outcome).unwrap();
        assert_eq!(reply.content.as_text(), Some("4"));
    }
}
