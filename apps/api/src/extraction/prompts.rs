// Extraction prompt templates.
// The prompt is the whole contract with the model, so it is built from the field list alone.

/// System prompt shared by every provider adapter.
pub const EXTRACTION_SYSTEM: &str = "\
You are a meticulous insurance document data extractor. \
You MUST respond with a single valid JSON object only. \
Do NOT use markdown code fences. \
Do NOT include explanations, comments or apologies.";

const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract the following fields from {source}.

FIELDS (use each name below as an exact JSON key, spelled and cased exactly as written):
{field_list}

RULES:
1. Respond with JSON only: one object whose keys are exactly the field names above, nothing else.
2. If a field is not present in the document, set its value to null. Never omit a key and never guess or infer a value.
3. Copy values as they appear: preserve units, currency symbols, percent signs and punctuation.
4. Normalize whitespace: collapse line breaks and repeated spaces inside a value into single spaces.
5. Return every value as a JSON string (or null).

OUTPUT SHAPE:
{skeleton}
{document}"#;

/// Where the model finds the document the prompt refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceContext<'a> {
    /// The PDF travels alongside the prompt as an attachment.
    FileName(&'a str),
    /// The document's extracted text is embedded in the prompt itself.
    InlineText(&'a str),
}

/// Builds the extraction instructions for `fields`. Pure and deterministic.
pub fn build_extraction_prompt(fields: &[&str], context: &SourceContext<'_>) -> String {
    let field_list = fields
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {}", i + 1, f))
        .collect::<Vec<_>>()
        .join("\n");

    let skeleton = {
        let entries = fields
            .iter()
            .map(|f| format!("  {}: \"string\" | null", json_key(f)))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("{{\n{entries}\n}}")
    };

    let (source, document) = match context {
        SourceContext::FileName(name) => (format!("the attached PDF document \"{name}\""), String::new()),
        SourceContext::InlineText(text) => (
            "the document text below".to_string(),
            format!("\nDOCUMENT TEXT:\n<<<\n{text}\n>>>\n"),
        ),
    };

    EXTRACTION_PROMPT_TEMPLATE
        .replace("{source}", &source)
        .replace("{field_list}", &field_list)
        .replace("{skeleton}", &skeleton)
        .replace("{document}", &document)
}

fn json_key(field: &str) -> String {
    serde_json::Value::String(field.to_string()).to_string()
}
