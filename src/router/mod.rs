//! Tool routing and identifier resolution
//!
//! Handles:
//! - Resolving labels, hostnames and descriptions to Vultr object IDs
//! - Glob filtering of exposed tool names
//! - Resource URI template matching

mod matcher;
mod resolver;

pub use matcher::{ToolFilter, UriTemplate};
pub use resolver::{id_string, is_uuid, IdentifierResolver, ResolveError};
