//! Domain objects parsing and tool/resource/prompt integrations
//!
//! Provides the YouTube search logic exposed over the MCP protocol

pub mod prompts;
pub mod resources;
pub mod tools;
pub mod utils;
