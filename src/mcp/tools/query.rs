//! The `neo4j_query` tool: caller-supplied read-only Cypher.
//!
//! Queries pass [`ensure_read_only`](crate::safety::ensure_read_only) before
//! anything is sent to the store. A row cap is appended as a bound parameter
//! when the query does not carry its own `LIMIT`.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::errors::{Result, SchemaGraphError};
use crate::graph::{params, GraphDriver, Params};
use crate::safety::{ensure_read_only, has_limit_clause, preview};

use super::{arg_bool, arg_i64, arg_str, ParamSpec, ParamType, SourceMetadata, Tool, ToolDescriptor};

/// Name under which the tool is registered.
pub const QUERY_TOOL_NAME: &str = "neo4j_query";

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// Parameter name the appended row cap is bound to.
const LIMIT_PARAM: &str = "result_limit";

/// Longest query text echoed into logs.
const LOG_PREVIEW_CHARS: usize = 200;

/// Free-form read-only Cypher against the stored schema graph.
pub struct QueryTool {
    descriptor: ToolDescriptor,
    driver: Arc<dyn GraphDriver>,
    metadata: SourceMetadata,
}

impl QueryTool {
    /// Creates the tool. Connectivity is logged, not required.
    pub fn new(driver: Arc<dyn GraphDriver>, metadata: SourceMetadata) -> Self {
        if let Err(e) = driver.verify_connectivity() {
            error!(error = %e, "query tool failed to connect to graph store");
        }

        let description = format!(
            "Execute read-only Cypher queries to explore the {src} schema stored in {store}. \
             Query tables, columns, constraints and relationships to generate accurate SQL. \
             Example: MATCH (t:Table)-[:HAS_COLUMN]->(c:Column) WHERE t.table_name = 'customer' \
             RETURN c.column_name, c.data_type. READ-ONLY queries only.",
            src = metadata.source_system,
            store = metadata.storage_system
        );

        Self {
            descriptor: ToolDescriptor::new(
                QUERY_TOOL_NAME,
                description,
                vec![
                    ParamSpec::required(
                        "cypher_query",
                        ParamType::String,
                        "Read-only Cypher query, starting with MATCH, RETURN, SHOW, EXPLAIN, \
                         PROFILE, WITH, UNWIND or OPTIONAL MATCH",
                    ),
                    ParamSpec::optional(
                        "limit",
                        ParamType::Integer,
                        "Maximum number of results to return (default: 100, max: 1000)",
                    ),
                    ParamSpec::optional(
                        "include_query_plan",
                        ParamType::Boolean,
                        "Include the query execution plan (default: false)",
                    ),
                ],
            ),
            driver,
            metadata,
        }
    }

    fn run(&self, query: &str, params: &Params) -> Result<Vec<Value>> {
        match self.driver.run(query, params) {
            Ok(rows) => Ok(rows.into_iter().map(Value::Object).collect()),
            Err(e) => {
                error!(error = %e, query = %preview(query, LOG_PREVIEW_CHARS), "cypher query failed");
                Err(SchemaGraphError::QueryExecution {
                    message: e.to_string(),
                })
            }
        }
    }

    fn guidance(&self) -> Value {
        json!({
            "use_case": format!("Explore the {} schema to generate SQL queries", self.metadata.source_system),
            "entity_types": "Table, Column, Constraint, Index",
            "relationships": "HAS_COLUMN, REFERENCES (FK), HAS_CONSTRAINT, HAS_INDEX, INDEXES",
            "sql_generation_tip": "Use table_name and column info to build SELECT, JOIN, WHERE clauses",
        })
    }
}

/// Appends a bound row cap unless the query already has a `LIMIT`.
///
/// The cap goes on its own line so a trailing `//` comment cannot hide it.
pub fn apply_limit(query: &str, limit: Option<i64>) -> (String, Params) {
    match limit {
        Some(n) if !has_limit_clause(query) => {
            let base = query.trim_end().trim_end_matches(';').trim_end();
            (
                format!("{base}\nLIMIT ${LIMIT_PARAM}"),
                params([(LIMIT_PARAM, json!(n))]),
            )
        }
        _ => (query.to_string(), Params::new()),
    }
}

/// Drops a leading `EXPLAIN` or `PROFILE` so the plan request carries only
/// one planning prefix.
pub fn plan_target(query: &str) -> &str {
    let query = query.trim_start();
    for prefix in ["EXPLAIN", "PROFILE"] {
        let Some(head) = query.get(..prefix.len()) else {
            continue;
        };
        let rest = &query[prefix.len()..];
        if head.eq_ignore_ascii_case(prefix) && rest.starts_with(char::is_whitespace) {
            return rest.trim_start();
        }
    }
    query
}

impl Tool for QueryTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute(&self, args: &Value) -> Result<Value> {
        let cypher_query = arg_str(args, "cypher_query").unwrap_or_default().trim();
        if cypher_query.is_empty() {
            return Err(SchemaGraphError::invalid_argument(
                "cypher_query parameter is required",
            ));
        }

        let limit = arg_i64(args, "limit")?.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(SchemaGraphError::invalid_argument(format!(
                "limit must be a positive integer between 1 and {MAX_LIMIT}"
            )));
        }
        let include_plan = arg_bool(args, "include_query_plan").unwrap_or(false);

        ensure_read_only(cypher_query)?;

        let (statement, bound) = apply_limit(cypher_query, Some(limit));
        debug!(query = %preview(&statement, LOG_PREVIEW_CHARS), "running cypher query");
        let results = self.run(&statement, &bound)?;

        let mut response = self.metadata.wrap(
            format!("{} schema exploration for SQL generation", self.metadata.source_system),
            json!({
                "query": cypher_query,
                "result_count": results.len(),
                "results": results,
                "guidance": self.guidance(),
            }),
        );

        if include_plan {
            match self.driver.explain(plan_target(cypher_query)) {
                Ok(plan) => response["query_plan"] = plan,
                Err(e) => {
                    warn!(error = %e, query = %preview(cypher_query, LOG_PREVIEW_CHARS), "could not get query plan");
                    response["query_plan_error"] = json!(e.to_string());
                }
            }
        }

        Ok(response)
    }
}
