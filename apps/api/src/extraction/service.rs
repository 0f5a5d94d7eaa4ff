//! Extraction orchestration: single-document extraction and two-document comparison.
//!
//! Every precondition (file count, file type, size) is checked before the first
//! provider call. A request yields a fully normalized result or fails as a whole.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, info_span, Instrument};

use crate::comparison::{compare_records, ComparisonEntry, ComparisonSummary};
use crate::extraction::document::{DocumentLimits, PdfDocument};
use crate::extraction::error::ExtractionError;
use crate::extraction::normalize::normalize_raw_text;
use crate::extraction::prompts::{build_extraction_prompt, SourceContext};
use crate::extraction::record::ExtractedRecord;
use crate::extraction::text::extract_text;
use crate::plans::PayerPlan;
use crate::provider::{ApiCredential, DocumentExtractionProvider, SubmissionMode};

const COMPARE_FILE_COUNT: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub summary: ComparisonSummary,
    pub entries: Vec<ComparisonEntry>,
}

/// Runs submission and normalization for one already-validated document.
async fn submit_and_normalize(
    provider: &dyn DocumentExtractionProvider,
    plan: PayerPlan,
    document: &PdfDocument,
    credential: &ApiCredential,
) -> Result<ExtractedRecord, ExtractionError> {
    let started = Instant::now();

    let instructions = match provider.submission_mode() {
        SubmissionMode::Attachment => build_extraction_prompt(
            plan.fields(),
            &SourceContext::FileName(&document.file_name),
        ),
        SubmissionMode::InlineText => {
            let text = extract_text(document).await?;
            build_extraction_prompt(plan.fields(), &SourceContext::InlineText(&text))
        }
    };

    let raw = provider.submit(document, &instructions, credential).await?;
    let record = normalize_raw_text(plan, &raw)?;

    info!(
        plan = %record.plan(),
        elapsed_ms = %started.elapsed().as_millis(),
        fields_found = record.present_count(),
        fields_expected = record.field_count(),
        "Document extracted"
    );
    Ok(record)
}

/// Single mode: validate, submit, normalize.
pub async fn extract_single(
    provider: &dyn DocumentExtractionProvider,
    plan: PayerPlan,
    document: &PdfDocument,
    credential: &ApiCredential,
    limits: &DocumentLimits,
) -> Result<ExtractedRecord, ExtractionError> {
    document.validate(limits)?;

    let span = info_span!(
        "extract",
        provider = provider.name(),
        plan = %plan,
        file_name = %document.file_name,
        size = document.len(),
    );
    submit_and_normalize(provider, plan, document, credential)
        .instrument(span)
        .await
}

/// Compare mode: exactly two documents, submitted concurrently, then diffed.
pub async fn compare_documents(
    provider: &dyn DocumentExtractionProvider,
    plan: PayerPlan,
    documents: &[PdfDocument],
    credential: &ApiCredential,
    limits: &DocumentLimits,
) -> Result<ComparisonReport, ExtractionError> {
    let [first, second] = documents else {
        return Err(ExtractionError::WrongFileCount {
            expected: COMPARE_FILE_COUNT,
            actual: documents.len(),
        });
    };
    first.validate(limits)?;
    second.validate(limits)?;

    let span_for = |slot: &'static str, document: &PdfDocument| {
        info_span!(
            "extract",
            slot,
            provider = provider.name(),
            plan = %plan,
            file_name = %document.file_name,
            size = document.len(),
        )
    };

    let (left, right) = tokio::try_join!(
        submit_and_normalize(provider, plan, first, credential).instrument(span_for("file1", first)),
        submit_and_normalize(provider, plan, second, credential)
            .instrument(span_for("file2", second)),
    )?;

    let entries = compare_records(plan.fields(), &left, &right);
    let summary = ComparisonSummary::from_entries(&entries);
    info!(
        plan = %plan,
        same = summary.same,
        different = summary.different,
        missing = summary.missing,
        "Documents compared"
    );

    Ok(ComparisonReport { summary, entries })
}
