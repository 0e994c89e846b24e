pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod extract;
pub mod fanout;
pub mod log;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod session;
pub mod ux;
pub mod wire;
