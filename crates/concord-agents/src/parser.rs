//! Pulling structured verdicts out of free-form chat replies.

use serde::Deserialize;

use crate::error::AgentError;

const FENCES: [&str; 4] = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

fn is_json(candidate: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(candidate).is_ok()
}

/// Return the JSON object embedded in a chat reply.
///
/// The reply is tried as-is, then as the body of a fenced code block, then
/// as the first brace-balanced span; the first candidate that parses wins.
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let reply = text.trim();
    let whole = reply.starts_with('{').then_some(reply);

    whole
        .into_iter()
        .chain(fenced_block(reply))
        .chain(balanced_object(reply))
        .find(|candidate| is_json(candidate))
        .map(str::to_string)
        .ok_or_else(|| {
            AgentError::Analysis(format!(
                "Chat reply holds no JSON object ({} bytes)",
                text.len()
            ))
        })
}

fn fenced_block(text: &str) -> Option<&str> {
    FENCES.iter().find_map(|fence| {
        let body = &text[text.find(fence)? + fence.len()..];
        let end = body.find("```")?;
        Some(body[..end].trim())
    })
}

/// First `{ ... }` span whose braces balance, ignoring braces inside strings.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Verdict the narrative agent asks the chat model for.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Verdict {
    /// Sentiment of the narrative in [-1, 1].
    pub score: f64,
    pub reasoning: String,
}

/// Parse a [`Verdict`] from raw chat output.
pub fn parse_verdict(raw: &str) -> Result<Verdict, AgentError> {
    let json_str = extract_json(raw)?;
    let verdict: Verdict = serde_json::from_str(&json_str)
        .map_err(|e| AgentError::Analysis(format!("Failed to parse verdict: {e}\nJSON: {json_str}")))?;
    if !verdict.score.is_finite() || !(-1.0..=1.0).contains(&verdict.score) {
        return Err(AgentError::Analysis(format!(
            "Verdict score {} outside [-1, 1]",
            verdict.score
        )));
    }
    Ok(verdict)
}
