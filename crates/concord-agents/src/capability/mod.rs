//! Helper capabilities agents may use: chat completion and passage retrieval.

pub mod chat;
pub mod retrieval;

pub use chat::{check_cli_available, ChatCompletion, ChatOptions, ClaudeCli};
pub use retrieval::{KeywordIndex, Passage, Retriever};
