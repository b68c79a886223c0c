//! MCP (Model Context Protocol) server for Sikt.
//!
//! Exposes the video tool catalog to AI assistants over JSON-RPC 2.0 on
//! stdio.

mod protocol;
mod server;
mod tools;

pub use server::McpServer;
pub use tools::{get_tools, ToolName};
