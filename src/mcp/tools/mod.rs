//! Tool contract and the schema tools exposed by the server.
//!
//! A tool is a named capability with a declared parameter list and an
//! `execute` operation. Parameter descriptors are turned into the JSON Schema
//! that `tools/list` advertises, and the same descriptors drive argument
//! validation before a tool ever runs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::errors::{Result, SchemaGraphError};

/// Free-form Cypher query tool.
pub mod query;

/// Fixed-shape schema exploration tool.
pub mod schema;

pub use query::QueryTool;
pub use schema::{SchemaKind, SchemaTool};

/// A tool definition as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    /// Returns the JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

/// Declaration of one tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub description: &'static str,
    /// Allowed literal values, if the parameter is enumerated.
    pub allowed: Option<&'static [&'static str]>,
    pub required: bool,
}

impl ParamSpec {
    /// A required parameter.
    pub fn required(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            allowed: None,
            required: true,
        }
    }

    /// An optional parameter.
    pub fn optional(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    /// Restricts the parameter to the given values.
    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

/// Name, description and ordered parameter list of a tool.
///
/// Fixed once the tool is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParamSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Builds the JSON Schema object describing this tool's input.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = json!({
                "type": param.kind.as_str(),
                "description": param.description,
            });
            if let Some(allowed) = param.allowed {
                prop["enum"] = json!(allowed);
            }
            properties.insert(param.name.to_string(), prop);

            if param.required {
                required.push(param.name);
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Returns the definition advertised by `tools/list`.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
        }
    }

    /// Checks caller arguments against the declared parameters.
    ///
    /// Arguments must be an object. Every required parameter must be present
    /// and non-null; every supplied parameter must have its declared type and,
    /// if enumerated, one of the allowed values. Unknown keys are ignored.
    pub fn validate(&self, args: &Value) -> Result<()> {
        let obj = match args {
            Value::Object(map) => map,
            Value::Null => return self.check_required(&Map::new()),
            other => {
                return Err(SchemaGraphError::invalid_argument(format!(
                    "arguments for '{}' must be an object, got {}",
                    self.name,
                    json_type_name(other)
                )))
            }
        };

        self.check_required(obj)?;

        for param in &self.parameters {
            let value = match obj.get(param.name) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            if !param.kind.accepts(value) {
                return Err(SchemaGraphError::invalid_argument(format!(
                    "parameter '{}' must be of type {}, got {}",
                    param.name,
                    param.kind.as_str(),
                    json_type_name(value)
                )));
            }
            if let (Some(allowed), Some(s)) = (param.allowed, value.as_str()) {
                if !allowed.contains(&s) {
                    return Err(SchemaGraphError::invalid_argument(format!(
                        "parameter '{}' must be one of [{}], got '{}'",
                        param.name,
                        allowed.join(", "),
                        s
                    )));
                }
            }
        }

        Ok(())
    }

    fn check_required(&self, obj: &Map<String, Value>) -> Result<()> {
        match self
            .parameters
            .iter()
            .find(|p| p.required && obj.get(p.name).is_none_or(Value::is_null))
        {
            Some(missing) => Err(SchemaGraphError::invalid_argument(format!(
                "missing required parameter: {}",
                missing.name
            ))),
            None => Ok(()),
        }
    }
}

/// Describes where the schema came from and where it is stored.
///
/// Stamped onto every tool payload so the agent knows which SQL dialect the
/// explored schema belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMetadata {
    pub source_system: String,
    pub storage_system: String,
}

impl SourceMetadata {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_system: config.source_system.clone(),
            storage_system: config.storage_system.clone(),
        }
    }

    /// Wraps `payload` (an object) with the metadata header fields.
    pub fn wrap(&self, purpose: impl Into<String>, payload: Value) -> Value {
        let mut out = Map::new();
        out.insert("database_type".to_string(), json!(self.source_system));
        out.insert("storage_type".to_string(), json!(self.storage_system));
        out.insert("purpose".to_string(), json!(purpose.into()));
        if let Value::Object(fields) = payload {
            out.extend(fields);
        }
        Value::Object(out)
    }
}

impl Default for SourceMetadata {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A capability the server exposes to agents.
pub trait Tool: Send + Sync {
    /// Returns the tool's name, description and parameters.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Runs the tool with already-validated arguments and returns its payload.
    fn execute(&self, args: &Value) -> Result<Value>;

    /// Shorthand for `descriptor().name`.
    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

/// Reads an optional string argument.
pub fn arg_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

/// Reads an optional integer argument.
///
/// Absent or `null` is `Ok(None)`; a value that does not fit an `i64` is an
/// `InvalidArgument` error.
pub fn arg_i64(args: &Value, name: &str) -> Result<Option<i64>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            SchemaGraphError::invalid_argument(format!(
                "parameter '{name}' must be an integer in the i64 range, got {value}"
            ))
        }),
    }
}

/// Reads an optional boolean argument.
pub fn arg_bool(args: &Value, name: &str) -> Option<bool> {
    args.get(name).and_then(Value::as_bool)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
