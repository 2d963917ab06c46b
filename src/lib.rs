// Promptchain - iterative LLM prompt chain
// Library exports

pub mod chain;
pub mod cli;
pub mod config;
pub mod providers;
pub mod server;
