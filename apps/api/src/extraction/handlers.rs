//! Axum route handlers for the Extraction API.

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::comparison::{ComparisonEntry, ComparisonSummary};
use crate::errors::AppError;
use crate::extraction::document::PdfDocument;
use crate::extraction::error::ExtractionError;
use crate::extraction::record::ExtractedRecord;
use crate::extraction::service::{compare_documents, extract_single};
use crate::plans::PayerPlan;
use crate::provider::ApiCredential;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-provider-api-key";
const UNNAMED_FILE_FIELDS: &[&str] = &["file", "files"];
const SLOT_FILE_FIELDS: [&str; 2] = ["file1", "file2"];

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Parsed multipart body shared by both endpoints.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub plan: Option<String>,
    pub api_key: Option<String>,
    pub files: Vec<PdfDocument>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub request_id: Uuid,
    pub plan: PayerPlan,
    pub provider: &'static str,
    pub file_name: String,
    pub extracted_at: DateTime<Utc>,
    pub record: ExtractedRecord,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub request_id: Uuid,
    pub plan: PayerPlan,
    pub provider: &'static str,
    pub files: Vec<String>,
    pub compared_at: DateTime<Utc>,
    pub summary: ComparisonSummary,
    pub entries: Vec<ComparisonEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Request parsing
// ────────────────────────────────────────────────────────────────────────────

/// File parts as they arrive. `file1`/`file2` fill fixed slots whatever their order;
/// `file`/`files` parts keep arrival order. A request uses one style or the other.
#[derive(Debug, Default)]
struct FileParts {
    slots: [Option<PdfDocument>; 2],
    unnamed: Vec<PdfDocument>,
}

impl FileParts {
    fn push(&mut self, part_name: &str, document: PdfDocument) -> Result<(), AppError> {
        let Some(slot) = SLOT_FILE_FIELDS.iter().position(|n| *n == part_name) else {
            self.unnamed.push(document);
            return Ok(());
        };
        if self.slots[slot].is_some() {
            return Err(AppError::Validation(format!(
                "'{part_name}' was sent more than once"
            )));
        }
        self.slots[slot] = Some(document);
        Ok(())
    }

    fn into_ordered(self) -> Result<Vec<PdfDocument>, AppError> {
        let [first, second] = self.slots;
        match (first, second) {
            (None, None) => Ok(self.unnamed),
            _ if !self.unnamed.is_empty() => Err(AppError::Validation(
                "Send files as 'file1'/'file2' or as 'file'/'files', not both".to_string(),
            )),
            (None, Some(_)) => Err(AppError::Validation(
                "'file2' was sent without 'file1'".to_string(),
            )),
            (Some(first), second) => Ok(std::iter::once(first).chain(second).collect()),
        }
    }
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    let mut files = FileParts::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "plan" => form.plan = Some(read_text(field).await?),
            "api_key" => form.api_key = Some(read_text(field).await?),
            n if UNNAMED_FILE_FIELDS.contains(&n) || SLOT_FILE_FIELDS.contains(&n) => {
                let file_name = field.file_name().unwrap_or("document").to_string();
                let media_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read file '{file_name}': {e}"))
                })?;
                files.push(n, PdfDocument::new(file_name, media_type, bytes))?;
            }
            _ => {}
        }
    }

    form.files = files.into_ordered()?;
    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart field: {e}")))
}

fn resolve_plan(form: &UploadForm) -> Result<PayerPlan, AppError> {
    let raw = form
        .plan
        .as_deref()
        .ok_or_else(|| AppError::Validation("'plan' field is required".to_string()))?;
    Ok(raw.parse::<PayerPlan>().map_err(ExtractionError::from)?)
}

/// Header first, then the form field, then the configured fallback.
fn resolve_credential(
    headers: &HeaderMap,
    form: &UploadForm,
    fallback: Option<&ApiCredential>,
) -> Result<ApiCredential, ExtractionError> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(ApiCredential::new)
        .or_else(|| form.api_key.as_deref().and_then(ApiCredential::new))
        .or_else(|| fallback.cloned())
        .ok_or(ExtractionError::MissingCredential)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/extract
///
/// Multipart: `plan`, one `file`, optional `api_key`. Returns the normalized record.
pub async fn handle_extract(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let form = read_upload_form(&mut multipart).await?;
    let plan = resolve_plan(&form)?;
    let credential = resolve_credential(&headers, &form, state.config.fallback_api_key.as_ref())?;

    let [document] = form.files.as_slice() else {
        return Err(ExtractionError::WrongFileCount {
            expected: 1,
            actual: form.files.len(),
        }
        .into());
    };

    let record = extract_single(
        state.provider.as_ref(),
        plan,
        document,
        &credential,
        &state.config.limits,
    )
    .instrument(info_span!("request", %request_id, mode = "single"))
    .await?;

    info!(%request_id, plan = %plan, "Extraction request completed");

    Ok(Json(ExtractResponse {
        request_id,
        plan,
        provider: state.provider.name(),
        file_name: document.file_name.clone(),
        extracted_at: Utc::now(),
        record,
    }))
}

/// POST /api/v1/compare
///
/// Multipart: `plan`, exactly two files, optional `api_key`. Both documents are
/// extracted concurrently, then diffed field by field.
pub async fn handle_compare(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<CompareResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let form = read_upload_form(&mut multipart).await?;
    let plan = resolve_plan(&form)?;
    let credential = resolve_credential(&headers, &form, state.config.fallback_api_key.as_ref())?;

    let report = compare_documents(
        state.provider.as_ref(),
        plan,
        &form.files,
        &credential,
        &state.config.limits,
    )
    .instrument(info_span!("request", %request_id, mode = "compare"))
    .await?;

    info!(%request_id, plan = %plan, "Comparison request completed");

    Ok(Json(CompareResponse {
        request_id,
        plan,
        provider: state.provider.name(),
        files: form.files.iter().map(|f| f.file_name.clone()).collect(),
        compared_at: Utc::now(),
        summary: report.summary,
        entries: report.entries,
    }))
}
