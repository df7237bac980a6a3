const MAX_ERROR_MESSAGE_LEN: usize = 256;
const CANNED_PREVIEW_CHARS: usize = 50;

pub(crate) fn truncate_message(body: &str) -> String {
    let compact = body.trim().replace('\n', " ");
    compact.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}

pub(crate) fn non_empty_owned(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Deterministic offline reply: `"<label> response for: <first 50 chars>..."`.
pub(crate) fn canned_response(label: &str, prompt: &str) -> String {
    let preview: String = prompt.chars().take(CANNED_PREVIEW_CHARS).collect();
    format!("{label} response for: {preview}...")
}
