use crate::domain::entities::{chat_message::ChatMessage, context_item::StoredContextItem};

pub const QUESTION_HEADER: &str = "# User question:\n";
pub const RETRIEVED_INFORMATION_HEADER: &str = "# Retrieved information:\n";

/// Joins the texts of the retrieved items into a single context block, one item per line.
///
/// Image items contribute their caption. No items gives an empty block.
pub fn build_context_block(items: &[StoredContextItem]) -> String {
    items
        .iter()
        .map(|item| item.payload.context_text())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assembles the fixed sequence of messages sent to the chat completion service:
/// the system prompt, the user question, the retrieved context carried by an assistant message,
/// and an empty trailing assistant turn.
pub fn build_prompt_messages(
    system_prompt: &str,
    question: &str,
    context_block: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(format!("{}{}", QUESTION_HEADER, question)),
        ChatMessage::assistant(format!("{}{}", RETRIEVED_INFORMATION_HEADER, context_block)),
        ChatMessage::assistant(""),
    ]
}
