//! MCP (Model Context Protocol) server for the stored schema graph.
//!
//! Provides a JSON-RPC 2.0 interface so that AI agents can discover tables,
//! columns, constraints and relationships of a relational schema kept in a
//! graph store, and run read-only Cypher against it.

/// Tool registry and dispatch.
pub mod registry;

/// Protocol engine and stdio loop.
pub mod server;

/// Tool contract and the schema tools.
pub mod tools;

/// JSON-RPC 2.0 transport types.
pub mod transport;

use std::sync::Arc;

use crate::config::Config;
use crate::graph::GraphDriver;

pub use registry::ToolRegistry;
pub use server::{McpServer, ServerIdentity};
pub use tools::{QueryTool, SchemaTool, SourceMetadata, Tool, ToolDefinition, ToolDescriptor};
pub use transport::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Builds a registry holding the schema and query tools over one shared driver.
pub fn default_registry(driver: Arc<dyn GraphDriver>, config: &Config) -> ToolRegistry {
    let metadata = SourceMetadata::from_config(config);
    let mut registry = ToolRegistry::new();
    registry.register(SchemaTool::new(Arc::clone(&driver), metadata.clone()));
    registry.register(QueryTool::new(driver, metadata));
    registry
}
