use crate::error::OracleError;
use async_trait::async_trait;

/// Infers the identifier that replaced `stale_id` in `snapshot`.
///
/// Implementations return the bare identifier. Whether it actually exists
/// in the document is checked by the caller, not here.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn query(&self, stale_id: &str, snapshot: &str) -> Result<String, OracleError>;
}

pub const SYSTEM_PROMPT: &str = "You are an AI assistant tasked with analyzing HTML code and \
identifying the correct ID for a specific element. The current ID being used is no longer \
valid, and you need to find the updated ID in the provided HTML.";

pub fn user_prompt(stale_id: &str, snapshot: &str) -> String {
    format!(
        "The current ID \"{stale_id}\" is not found in the HTML. Please analyze the following \
HTML and identify the correct ID for the element that most closely matches the purpose of \
\"{stale_id}\". Only return the new ID, nothing else.\n\nHTML:\n{snapshot}"
    )
}

/// Reduces a raw completion to the identifier it names.
///
/// Surrounding whitespace and one layer of matching quotes or backticks are
/// dropped; anything else is trusted verbatim.
pub fn parse_answer(raw: &str) -> Result<String, OracleError> {
    let trimmed = raw.trim();
    let unquoted = ['`', '"', '\'']
        .iter()
        .find_map(|quote| {
            trimmed
                .strip_prefix(*quote)
                .and_then(|rest| rest.strip_suffix(*quote))
        })
        .unwrap_or(trimmed)
        .trim();

    if unquoted.is_empty() {
        return Err(OracleError::CallFailed(
            "oracle returned an empty identifier".to_string(),
        ));
    }
    Ok(unquoted.to_string())
}
