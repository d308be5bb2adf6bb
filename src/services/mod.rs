pub mod inference;
pub mod matching;
pub mod pipeline;
pub mod prompts;
pub mod queue;
pub mod store;
