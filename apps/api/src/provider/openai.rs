//! OpenAI adapters.
//!
//! - `OpenAiResponsesProvider`: upload the PDF, reference it from a Responses API call,
//!   then delete the upload.
//! - `OpenAiTextProvider`: the caller embeds locally extracted text in the prompt; one
//!   Chat Completions call in JSON mode.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::extraction::document::{PdfDocument, PDF_MEDIA_TYPE};
use crate::extraction::prompts::EXTRACTION_SYSTEM;
use crate::provider::{
    check_status, ApiCredential, DocumentExtractionProvider, ProviderError, SubmissionMode,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1";

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
}

/// Shared HTTP plumbing for the OpenAI adapters: auth, file upload, resource deletion.
#[derive(Clone)]
pub struct OpenAiHttp {
    client: Client,
    base_url: String,
}

impl OpenAiHttp {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn get(&self, path: &str, credential: &ApiCredential) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(credential.expose())
    }

    pub(crate) fn post(&self, path: &str, credential: &ApiCredential) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(credential.expose())
    }

    /// Uploads the PDF and returns the file id.
    pub(crate) async fn upload_file(
        &self,
        document: &PdfDocument,
        purpose: &'static str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let part = Part::bytes(document.bytes.to_vec())
            .file_name(document.file_name.clone())
            .mime_str(PDF_MEDIA_TYPE)?;
        let form = Form::new().text("purpose", purpose).part("file", part);

        let response = self
            .post("files", credential)
            .multipart(form)
            .send()
            .await?;
        let file: FileObject = check_status(response, "file upload").await?.json().await?;

        debug!(file_id = %file.id, size = document.len(), "Uploaded document");
        Ok(file.id)
    }

    /// Deletes a server-side resource, logging instead of failing: the request's
    /// outcome is already decided by the time cleanup runs.
    pub(crate) async fn delete_quietly(
        &self,
        path: &str,
        credential: &ApiCredential,
        request: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) {
        let builder = request(
            self.client
                .delete(self.url(path))
                .bearer_auth(credential.expose()),
        );
        let outcome = match builder.send().await {
            Ok(response) => check_status(response, "cleanup").await.map(|_| ()),
            Err(e) => Err(ProviderError::Http(e)),
        };
        match outcome {
            Ok(()) => debug!(resource = path, "Deleted provider resource"),
            Err(e) => warn!(resource = path, error = %e, "Failed to delete provider resource"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Responses API
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ResponsesBody {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl ResponsesBody {
    /// Concatenated `output_text` parts of all message items.
    fn output_text(&self) -> Option<String> {
        let text: String = self
            .output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|c| c.kind == "output_text")
            .filter_map(|c| c.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

pub struct OpenAiResponsesProvider {
    http: OpenAiHttp,
    model: String,
}

impl OpenAiResponsesProvider {
    pub fn new(http: OpenAiHttp, model: String) -> Self {
        Self { http, model }
    }

    async fn generate(
        &self,
        file_id: &str,
        instructions: &str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let request_body = json!({
            "model": self.model,
            "instructions": EXTRACTION_SYSTEM,
            "input": [{
                "role": "user",
                "content": [
                    {"type": "input_file", "file_id": file_id},
                    {"type": "input_text", "text": instructions}
                ]
            }]
        });

        let response = self
            .http
            .post("responses", credential)
            .json(&request_body)
            .send()
            .await?;
        let body: ResponsesBody = check_status(response, "response generation")
            .await?
            .json()
            .await?;
        body.output_text().ok_or(ProviderError::EmptyContent)
    }
}

#[async_trait]
impl DocumentExtractionProvider for OpenAiResponsesProvider {
    fn name(&self) -> &'static str {
        "openai-responses"
    }

    async fn submit(
        &self,
        document: &PdfDocument,
        instructions: &str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let file_id = self.http.upload_file(document, "user_data", credential).await?;
        let result = self.generate(&file_id, instructions, credential).await;
        self.http
            .delete_quietly(&format!("files/{file_id}"), credential, |r| r)
            .await;
        result
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Chat Completions over extracted text
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiTextProvider {
    http: OpenAiHttp,
    model: String,
}

impl OpenAiTextProvider {
    pub fn new(http: OpenAiHttp, model: String) -> Self {
        Self { http, model }
    }
}

#[async_trait]
impl DocumentExtractionProvider for OpenAiTextProvider {
    fn name(&self) -> &'static str {
        "openai-text"
    }

    fn submission_mode(&self) -> SubmissionMode {
        SubmissionMode::InlineText
    }

    async fn submit(
        &self,
        _document: &PdfDocument,
        instructions: &str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let request_body = json!({
            "model": self.model,
            "temperature": 0,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": EXTRACTION_SYSTEM},
                {"role": "user", "content": instructions}
            ]
        });

        let response = self
            .http
            .post("chat/completions", credential)
            .json(&request_body)
            .send()
            .await?;
        let completion: ChatCompletion = check_status(response, "chat completion")
            .await?
            .json()
            .await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::EmptyContent)
    }
}
