//! Named tool instances and dispatch into them.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{error, info};

use crate::errors::{Result, SchemaGraphError};

use super::tools::{Tool, ToolDefinition};

/// Holds the tools the server exposes, keyed by name.
///
/// Listing follows registration order. Registering a name that is already
/// present replaces the old tool in place.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `tool`, replacing any tool registered under the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_boxed(Box::new(tool));
    }

    pub fn register_boxed(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                info!(tool = %name, "replacing registered tool");
                self.tools[slot] = tool;
            }
            None => {
                info!(tool = %name, "registered tool");
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&slot| self.tools[slot].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns every tool definition in registration order.
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.descriptor().definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Looks up `name`, validates `args` against its descriptor, and runs it.
    ///
    /// Unknown names fail before any tool runs. Failures inside `execute`
    /// come back as `ToolExecution`, keeping only the message.
    pub fn call(&self, name: &str, args: &Value) -> Result<Value> {
        let tool = self.get(name).ok_or_else(|| SchemaGraphError::ToolNotFound {
            name: name.to_string(),
        })?;

        tool.descriptor().validate(args)?;

        tool.execute(args).map_err(|e| {
            error!(tool = %name, error = %e, "tool execution error");
            SchemaGraphError::ToolExecution {
                tool: name.to_string(),
                message: e.to_string(),
            }
        })
    }
}
