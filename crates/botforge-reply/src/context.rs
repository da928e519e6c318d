use serde_json::{Value, json};

use botforge_types::Turn;

/// A reference document attached to a chatbot, supplied to the model as
/// additional system context.
#[derive(Debug, Clone)]
pub struct ReferenceFile {
    pub filename: String,
    pub content: String,
}

/// Assemble the chat-completion message list: the system prompt first,
/// then each reference file labeled with its filename, then the running
/// history in order. The caller appends the new user turn to the history
/// before building the context.
pub fn build_context(
    system_prompt: Option<&str>,
    reference_files: &[ReferenceFile],
    history: &[Turn],
) -> Vec<Value> {
    let mut messages = Vec::with_capacity(1 + reference_files.len() + history.len());

    if let Some(prompt) = system_prompt
        && !prompt.trim().is_empty()
    {
        messages.push(json!({"role": "system", "content": prompt}));
    }

    for file in reference_files {
        messages.push(json!({
            "role": "system",
            "content": format!("Reference file \"{}\":\n{}", file.filename, file.content),
        }));
    }

    for turn in history {
        messages.push(json!({"role": turn.role.as_str(), "content": turn.text}));
    }

    messages
}
