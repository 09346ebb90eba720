//! Conversation context formatting for model prompts.

use super::state::{ConversationState, Speaker};

/// Format the previous summary plus the last `recent` lines.
///
/// Lines are rendered as `User: ...` / `Assistant: ...`.
pub fn build_context(state: &ConversationState, recent: usize) -> String {
    let mut sections: Vec<String> = Vec::new();

    if let Some(summary) = &state.previous_summary {
        sections.push(format!("Previous conversation summary:\n{summary}"));
    }

    let start = state.transcript.len().saturating_sub(recent);
    let lines: Vec<String> = state.transcript[start..]
        .iter()
        .map(|turn| {
            let label = match turn.speaker {
                Speaker::User => "User",
                Speaker::Assistant => "Assistant",
            };
            format!("{label}: {}", turn.text)
        })
        .collect();
    if !lines.is_empty() {
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}
