pub mod prompt_messages;
