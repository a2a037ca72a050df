pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod middleware;
pub mod prompts;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
pub mod types;
