//! vultr-mcp - Vultr infrastructure management for the AI era
//!
//! vultr-mcp exposes the Vultr v2 REST API as Model Context Protocol tools
//! and resources, so an LLM-driven agent can manage DNS, instances, storage,
//! networking, Kubernetes and databases conversationally.
//!
//! The crate is layered bottom-up:
//! - [`client`]: the HTTP client with caching and retry
//! - [`zone`] and [`dns`]: zone-file conversion and record analysis
//! - [`router`]: smart identifier resolution and tool filtering
//! - [`tools`]: one MCP tool module per API area
//! - [`mcp`]: the JSON-RPC server that mounts the tool modules

pub mod cache;
pub mod client;
pub mod config;
pub mod dns;
pub mod mcp;
pub mod retry;
pub mod router;
pub mod tools;
pub mod zone;

use thiserror::Error;

pub use client::{ApiError, VultrClient};
pub use config::Config;

/// Core error types for vultr-mcp
#[derive(Error, Debug)]
pub enum VultrMcpError {
    #[error(transparent)]
    Api(#[from] client::ApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Zone file error: {0}")]
    Zone(#[from] zone::ZoneError),

    #[error(transparent)]
    Resolve(#[from] router::ResolveError),

    #[error(transparent)]
    Tool(#[from] tools::ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_is_transparent() {
        let err: VultrMcpError = client::ApiError::NotFound.into();
        assert_eq!(err.to_string(), "Vultr API error 404: Resource not found");
    }

    #[test]
    fn test_config_error_wrapping() {
        let err: VultrMcpError = config::ConfigError::MissingApiKey.into();
        assert!(err.to_string().starts_with("Configuration error:"));
    }
}
