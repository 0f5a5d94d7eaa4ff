//! OpenAI Assistants adapter: upload -> assistant -> thread -> run -> poll -> read reply.
//!
//! Every resource created along the way is deleted before `submit` returns, on success
//! and on failure. Polling stops at the configured deadline; a run that ends failed,
//! cancelled, expired, incomplete or waiting on tool output is a hard error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::extraction::document::PdfDocument;
use crate::extraction::prompts::EXTRACTION_SYSTEM;
use crate::provider::openai::OpenAiHttp;
use crate::provider::{check_status, ApiCredential, DocumentExtractionProvider, ProviderError};

const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: String,
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    Pending,
    Completed,
    Terminal,
}

fn classify_run_status(status: &str) -> RunPhase {
    match status {
        "queued" | "in_progress" | "cancelling" => RunPhase::Pending,
        "completed" => RunPhase::Completed,
        // failed, cancelled, expired, incomplete, requires_action, and anything newer
        _ => RunPhase::Terminal,
    }
}

impl MessageList {
    /// Text of the newest assistant message.
    fn assistant_text(&self) -> Option<String> {
        let message = self.data.iter().find(|m| m.role == "assistant")?;
        let text: String = message
            .content
            .iter()
            .filter(|c| c.kind == "text")
            .filter_map(|c| c.text.as_ref().map(|t| t.value.as_str()))
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

fn beta(request: RequestBuilder) -> RequestBuilder {
    request.header(BETA_HEADER.0, BETA_HEADER.1)
}

pub struct AssistantsProvider {
    http: OpenAiHttp,
    model: String,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl AssistantsProvider {
    pub fn new(
        http: OpenAiHttp,
        model: String,
        poll_interval: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            http,
            model,
            poll_interval,
            poll_timeout,
        }
    }

    async fn create(
        &self,
        path: &str,
        body: serde_json::Value,
        stage: &'static str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let response = beta(self.http.post(path, credential))
            .json(&body)
            .send()
            .await?;
        let created: IdObject = check_status(response, stage).await?.json().await?;
        debug!(stage, id = %created.id, "Created provider resource");
        Ok(created.id)
    }

    async fn with_assistant(
        &self,
        file_id: &str,
        instructions: &str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let assistant_id = self
            .create(
                "assistants",
                json!({
                    "model": self.model,
                    "instructions": EXTRACTION_SYSTEM,
                    "tools": [{"type": "file_search"}]
                }),
                "assistant creation",
                credential,
            )
            .await?;
        let result = self
            .with_thread(&assistant_id, file_id, instructions, credential)
            .await;
        self.http
            .delete_quietly(&format!("assistants/{assistant_id}"), credential, beta)
            .await;
        result
    }

    async fn with_thread(
        &self,
        assistant_id: &str,
        file_id: &str,
        instructions: &str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let thread_id = self
            .create(
                "threads",
                json!({
                    "messages": [{
                        "role": "user",
                        "content": instructions,
                        "attachments": [{"file_id": file_id, "tools": [{"type": "file_search"}]}]
                    }]
                }),
                "thread creation",
                credential,
            )
            .await?;
        let result = self.run_to_completion(assistant_id, &thread_id, credential).await;
        self.http
            .delete_quietly(&format!("threads/{thread_id}"), credential, beta)
            .await;
        result
    }

    async fn run_to_completion(
        &self,
        assistant_id: &str,
        thread_id: &str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let run_id = self
            .create(
                &format!("threads/{thread_id}/runs"),
                json!({"assistant_id": assistant_id}),
                "run creation",
                credential,
            )
            .await?;
        self.poll_run(thread_id, &run_id, credential).await?;

        let response = beta(self.http.get(
            &format!("threads/{thread_id}/messages?order=desc&run_id={run_id}"),
            credential,
        ))
        .send()
        .await?;
        let messages: MessageList = check_status(response, "message retrieval")
            .await?
            .json()
            .await?;
        messages.assistant_text().ok_or(ProviderError::EmptyContent)
    }

    async fn poll_run(
        &self,
        thread_id: &str,
        run_id: &str,
        credential: &ApiCredential,
    ) -> Result<(), ProviderError> {
        let started = Instant::now();
        let deadline = started + self.poll_timeout;

        loop {
            let response = beta(
                self.http
                    .get(&format!("threads/{thread_id}/runs/{run_id}"), credential),
            )
            .send()
            .await?;
            let run: RunObject = check_status(response, "run status").await?.json().await?;

            match classify_run_status(&run.status) {
                RunPhase::Completed => {
                    info!(
                        run_id = %run.id,
                        elapsed_ms = %started.elapsed().as_millis(),
                        "Assistant run completed"
                    );
                    return Ok(());
                }
                RunPhase::Terminal => {
                    return Err(ProviderError::RunTerminated {
                        status: run.status,
                        message: run
                            .last_error
                            .map(|e| e.message)
                            .unwrap_or_else(|| "no error detail".to_string()),
                    });
                }
                RunPhase::Pending => {}
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(ProviderError::PollTimeout {
                    seconds: self.poll_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl DocumentExtractionProvider for AssistantsProvider {
    fn name(&self) -> &'static str {
        "openai-assistants"
    }

    async fn submit(
        &self,
        document: &PdfDocument,
        instructions: &str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let file_id = self
            .http
            .upload_file(document, "assistants", credential)
            .await?;
        let result = self.with_assistant(&file_id, instructions, credential).await;
        self.http
            .delete_quietly(&format!("files/{file_id}"), credential, |r| r)
            .await;
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::{delete, get, post, MethodRouter};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::provider::test_support::{
        credential, http_client, sample_pdf, spawn_stub, CallLog,
    };

    /// A vendor stand-in whose run reports `pending_polls` x "in_progress", then `final_status`.
    fn assistants_stub(log: CallLog, pending_polls: usize, final_status: &'static str) -> Router {
        let polls = Arc::new(AtomicUsize::new(0));
        let (l1, l2, l3, l4, l5, l6) = (
            log.clone(),
            log.clone(),
            log.clone(),
            log.clone(),
            log.clone(),
            log.clone(),
        );

        Router::new()
            .route(
                "/files",
                post(move || {
                    l1.push("upload");
                    async { Json(json!({"id": "file-1"})) }
                }),
            )
            .route(
                "/assistants",
                post(move |headers: HeaderMap| {
                    l2.push("create assistant");
                    async move {
                        assert_eq!(headers["openai-beta"], "assistants=v2");
                        Json(json!({"id": "asst-1"}))
                    }
                }),
            )
            .route(
                "/threads",
                post(move |Json(body): Json<Value>| {
                    l3.push("create thread");
                    async move {
                        assert_eq!(
                            body["messages"][0]["attachments"][0]["file_id"],
                            "file-1"
                        );
                        Json(json!({"id": "thread-1"}))
                    }
                }),
            )
            .route(
                "/threads/:thread/runs",
                post(move || {
                    l4.push("create run");
                    async { Json(json!({"id": "run-1", "status": "queued"})) }
                }),
            )
            .route(
                "/threads/:thread/runs/:run",
                get(move || {
                    let n = polls.fetch_add(1, Ordering::SeqCst);
                    let status = if n < pending_polls { "in_progress" } else { final_status };
                    async move {
                        Json(json!({
                            "id": "run-1",
                            "status": status,
                            "last_error": if status == "failed" {
                                json!({"code": "server_error", "message": "file unreadable"})
                            } else {
                                Value::Null
                            }
                        }))
                    }
                }),
            )
            .route(
                "/threads/:thread/messages",
                get(move || {
                    l5.push("list messages");
                    async {
                        Json(json!({
                            "data": [{
                                "role": "assistant",
                                "content": [{"type": "text", "text": {"value": "{\"Network\": \"PPO\"}", "annotations": []}}]
                            }]
                        }))
                    }
                }),
            )
            .route("/files/:id", deleter(l6.clone(), "files"))
            .route("/assistants/:id", deleter(l6.clone(), "assistants"))
            .route("/threads/:thread", deleter(l6, "threads"))
    }

    fn deleter(log: CallLog, kind: &'static str) -> MethodRouter {
        delete(move |Path(id): Path<String>| {
            log.push(format!("delete {kind}/{id}"));
            async { Json(json!({"deleted": true})) }
        })
    }

    fn provider(base: String, timeout: Duration) -> AssistantsProvider {
        AssistantsProvider::new(
            OpenAiHttp::new(http_client(), Some(base)),
            "gpt-test".to_string(),
            Duration::from_millis(10),
            timeout,
        )
    }

    #[test]
    fn test_classify_run_status() {
        assert_eq!(classify_run_status("queued"), RunPhase::Pending);
        assert_eq!(classify_run_status("in_progress"), RunPhase::Pending);
        assert_eq!(classify_run_status("completed"), RunPhase::Completed);
        for status in ["failed", "cancelled", "expired", "incomplete", "requires_action"] {
            assert_eq!(classify_run_status(status), RunPhase::Terminal, "{status}");
        }
    }

    #[test]
    fn test_assistant_text_skips_user_messages() {
        let list: MessageList = serde_json::from_value(json!({
            "data": [
                {"role": "user", "content": [{"type": "text", "text": {"value": "prompt"}}]},
                {"role": "assistant", "content": [{"type": "text", "text": {"value": "{}"}}]}
            ]
        }))
        .unwrap();
        assert_eq!(list.assistant_text().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_completed_run_returns_reply_and_cleans_up() {
        let log = CallLog::default();
        let base = spawn_stub(assistants_stub(log.clone(), 2, "completed")).await;

        let text = provider(base, Duration::from_secs(5))
            .submit(&sample_pdf(), "extract", &credential())
            .await
            .unwrap();

        assert_eq!(text, "{\"Network\": \"PPO\"}");
        assert_eq!(
            log.calls(),
            vec![
                "upload",
                "create assistant",
                "create thread",
                "create run",
                "list messages",
                "delete threads/thread-1",
                "delete assistants/asst-1",
                "delete files/file-1",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_run_is_hard_error_and_cleans_up() {
        let log = CallLog::default();
        let base = spawn_stub(assistants_stub(log.clone(), 1, "failed")).await;

        let err = provider(base, Duration::from_secs(5))
            .submit(&sample_pdf(), "extract", &credential())
            .await
            .unwrap_err();

        match err {
            ProviderError::RunTerminated { status, message } => {
                assert_eq!(status, "failed");
                assert_eq!(message, "file unreadable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let calls = log.calls();
        assert!(!calls.contains(&"list messages".to_string()));
        assert!(calls.ends_with(&[
            "delete threads/thread-1".to_string(),
            "delete assistants/asst-1".to_string(),
            "delete files/file-1".to_string(),
        ]));
    }

    #[tokio::test]
    async fn test_expired_run_is_hard_error() {
        let base = spawn_stub(assistants_stub(CallLog::default(), 0, "expired")).await;

        let err = provider(base, Duration::from_secs(5))
            .submit(&sample_pdf(), "extract", &credential())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RunTerminated { ref status, .. } if status == "expired"));
    }

    #[tokio::test]
    async fn test_run_that_never_finishes_hits_deadline() {
        let log = CallLog::default();
        let base = spawn_stub(assistants_stub(log.clone(), usize::MAX, "completed")).await;

        let err = provider(base, Duration::from_millis(100))
            .submit(&sample_pdf(), "extract", &credential())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::PollTimeout { .. }));
        assert_eq!(log.calls().last().unwrap(), "delete files/file-1");
    }
}
