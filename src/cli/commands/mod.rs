pub mod prompts;
pub mod serve;
