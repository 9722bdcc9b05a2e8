pub mod config;
pub mod errors;
pub mod graph;
pub mod mcp;
pub mod safety;
