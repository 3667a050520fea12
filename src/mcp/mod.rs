//! Model Context Protocol (MCP) interface for LLM integration
//!
//! Exposes the Vultr API as MCP tools and resources that LLMs can discover
//! and use. Tool modules implement [`ToolModule`] and are mounted on the
//! [`McpServer`] under a name prefix.
//!
//! The MCP server communicates over stdio.

mod module;
mod server;
mod types;

pub use module::{ResourceDef, Schema, ToolModule, JSON_MIME, TEXT_MIME};
pub use server::McpServer;
pub use types::*;
