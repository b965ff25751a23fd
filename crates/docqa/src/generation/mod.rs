//! Answer generation: prompts and the multi-query answering engine

pub mod engine;
pub mod prompt;

pub use engine::{Answer, AnswerEngine};
pub use prompt::PromptBuilder;
