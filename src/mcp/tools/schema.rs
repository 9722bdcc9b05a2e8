//! The `neo4j_schema` tool.
//!
//! Answers structural questions about the stored schema using fixed,
//! read-only queries. Caller input never becomes query text except for the
//! entity label, which is quoted as an identifier.
//!
//! Counting and property discovery try an ordered list of strategies: the
//! APOC-based one first, then portable Cypher, then a zero-filled listing.
//! The first strategy that succeeds wins.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::errors::{Result, SchemaGraphError};
use crate::graph::{params, quote_identifier, GraphDriver, Params, Record};

use super::{arg_i64, arg_str, ParamSpec, ParamType, SourceMetadata, Tool, ToolDescriptor};

/// Name under which the tool is registered.
pub const SCHEMA_TOOL_NAME: &str = "neo4j_schema";

/// Values accepted by the `schema_type` parameter.
pub const SCHEMA_KINDS: &[&str] = &["overview", "nodes", "relationships", "properties", "sample_data"];

/// Default number of sample entities and relationships.
pub const DEFAULT_SAMPLE_LIMIT: i64 = 100;

/// Entities inspected when collecting the property keys of one label.
const PROPERTY_SAMPLE_SIZE: i64 = 100;

/// Kinds of schema information the tool reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Overview,
    Nodes,
    Relationships,
    Properties,
    SampleData,
}

#[allow(clippy::should_implement_trait)]
impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Overview => "overview",
            SchemaKind::Nodes => "nodes",
            SchemaKind::Relationships => "relationships",
            SchemaKind::Properties => "properties",
            SchemaKind::SampleData => "sample_data",
        }
    }

    /// Parses a `schema_type` value, returning `None` for unrecognized values.
    pub fn from_str(s: &str) -> Option<SchemaKind> {
        match s {
            "overview" => Some(SchemaKind::Overview),
            "nodes" => Some(SchemaKind::Nodes),
            "relationships" => Some(SchemaKind::Relationships),
            "properties" => Some(SchemaKind::Properties),
            "sample_data" => Some(SchemaKind::SampleData),
            _ => None,
        }
    }
}

/// One way of answering a question, tried in order with its siblings.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub query: &'static str,
    pub needs_apoc: bool,
}

pub const NODE_COUNT_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "apoc",
        query: "CALL db.labels() YIELD label \
                CALL { WITH label \
                  CALL apoc.cypher.run('MATCH (n:`' + label + '`) RETURN count(n) AS count', {}) YIELD value \
                  RETURN value.count AS count } \
                RETURN label, count ORDER BY count DESC",
        needs_apoc: true,
    },
    Strategy {
        name: "cypher",
        query: "CALL db.labels() YIELD label \
                CALL { WITH label \
                  MATCH (n) WHERE label IN labels(n) \
                  RETURN count(n) AS count } \
                RETURN label, count ORDER BY count DESC",
        needs_apoc: false,
    },
    Strategy {
        name: "zero-filled",
        query: "CALL db.labels() YIELD label RETURN label, 0 AS count ORDER BY label",
        needs_apoc: false,
    },
];

pub const RELATIONSHIP_COUNT_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "apoc",
        query: "CALL db.relationshipTypes() YIELD relationshipType \
                CALL { WITH relationshipType \
                  CALL apoc.cypher.run('MATCH ()-[r:`' + relationshipType + '`]->() RETURN count(r) AS count', {}) YIELD value \
                  RETURN value.count AS count } \
                RETURN relationshipType, count ORDER BY count DESC",
        needs_apoc: true,
    },
    Strategy {
        name: "cypher",
        query: "CALL db.relationshipTypes() YIELD relationshipType \
                CALL { WITH relationshipType \
                  MATCH ()-[r]->() WHERE type(r) = relationshipType \
                  RETURN count(r) AS count } \
                RETURN relationshipType, count ORDER BY count DESC",
        needs_apoc: false,
    },
    Strategy {
        name: "zero-filled",
        query: "CALL db.relationshipTypes() YIELD relationshipType \
                RETURN relationshipType, 0 AS count ORDER BY relationshipType",
        needs_apoc: false,
    },
];

pub const PROPERTY_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "apoc",
        query: "CALL db.labels() YIELD label \
                CALL { WITH label \
                  CALL apoc.cypher.run('MATCH (n:`' + label + '`) WITH keys(n) AS props UNWIND props AS prop RETURN DISTINCT prop LIMIT 50', {}) YIELD value \
                  RETURN value.prop AS property } \
                RETURN label, collect(property) AS properties ORDER BY label",
        needs_apoc: true,
    },
    Strategy {
        name: "cypher",
        query: "CALL db.labels() YIELD label \
                CALL { WITH label \
                  MATCH (n) WHERE label IN labels(n) \
                  UNWIND keys(n) AS prop \
                  RETURN DISTINCT prop LIMIT 50 } \
                RETURN label, collect(prop) AS properties ORDER BY label",
        needs_apoc: false,
    },
    Strategy {
        name: "zero-filled",
        query: "CALL db.labels() YIELD label RETURN label, [] AS properties ORDER BY label",
        needs_apoc: false,
    },
];

const ENTITY_COUNT_QUERY: &str = "MATCH (n) RETURN count(n) AS count";
const RELATIONSHIP_COUNT_QUERY: &str = "MATCH ()-[r]->() RETURN count(r) AS count";
const LABELS_QUERY: &str = "CALL db.labels() YIELD label RETURN collect(label) AS labels";
const RELATIONSHIP_TYPES_QUERY: &str =
    "CALL db.relationshipTypes() YIELD relationshipType RETURN collect(relationshipType) AS types";
const SAMPLE_ENTITIES_QUERY: &str =
    "MATCH (n) RETURN labels(n) AS labels, keys(n) AS properties LIMIT $limit";
const SAMPLE_RELATIONSHIPS_QUERY: &str = "MATCH (a)-[r]->(b) \
     RETURN labels(a) AS from_labels, type(r) AS relationship_type, labels(b) AS to_labels \
     LIMIT $limit";

/// Schema exploration over the stored relational schema graph.
pub struct SchemaTool {
    descriptor: ToolDescriptor,
    driver: Arc<dyn GraphDriver>,
    metadata: SourceMetadata,
    /// `Some(false)` only when the store was reachable and lacked APOC.
    apoc: Option<bool>,
}

impl SchemaTool {
    /// Creates the tool and probes the store once for connectivity and APOC.
    ///
    /// An unreachable store is logged, not fatal: each call reports its own
    /// failure instead.
    pub fn new(driver: Arc<dyn GraphDriver>, metadata: SourceMetadata) -> Self {
        let apoc = match driver.verify_connectivity() {
            Ok(()) => {
                let available = driver.has_apoc();
                if available {
                    info!("schema tool connected to graph store with APOC");
                } else {
                    info!("schema tool connected to graph store (APOC not available)");
                }
                Some(available)
            }
            Err(e) => {
                error!(error = %e, "schema tool failed to connect to graph store");
                None
            }
        };

        Self {
            descriptor: Self::describe(&metadata),
            driver,
            metadata,
            apoc,
        }
    }

    fn describe(metadata: &SourceMetadata) -> ToolDescriptor {
        ToolDescriptor::new(
            SCHEMA_TOOL_NAME,
            format!(
                "Get {src} database schema information (stored in {store}) for {src} SQL query \
                 generation. Exposes tables, columns, constraints, indexes and the relationships \
                 between them.",
                src = metadata.source_system,
                store = metadata.storage_system
            ),
            vec![
                ParamSpec::required(
                    "schema_type",
                    ParamType::String,
                    "Type of schema information to retrieve",
                )
                .one_of(SCHEMA_KINDS),
                ParamSpec::optional(
                    "node_label",
                    ParamType::String,
                    "Entity type to analyze: Table, Column, Constraint, or Index",
                ),
                ParamSpec::optional(
                    "limit",
                    ParamType::Integer,
                    "Maximum number of sample entities and relationships (default: 100)",
                ),
            ],
        )
    }

    /// Returns the APOC probe outcome, `None` if the store was unreachable.
    pub fn apoc_available(&self) -> Option<bool> {
        self.apoc
    }

    fn query(&self, query: &str, params: &Params) -> Result<Vec<Record>> {
        self.driver.run(query, params)
    }

    /// Tries each strategy in order; the first success wins.
    ///
    /// Strategies needing APOC are skipped when the store is known to lack
    /// it. If every strategy fails, the last error is returned.
    pub fn run_strategies(&self, what: &str, strategies: &[Strategy]) -> Result<Vec<Record>> {
        let mut last_err = None;
        for strategy in strategies {
            if strategy.needs_apoc && self.apoc == Some(false) {
                debug!(what, strategy = strategy.name, "skipping strategy, APOC not installed");
                continue;
            }
            match self.query(strategy.query, &Params::new()) {
                Ok(rows) => {
                    info!(what, strategy = strategy.name, "schema strategy succeeded");
                    return Ok(rows);
                }
                Err(e) => {
                    warn!(what, strategy = strategy.name, error = %e, "schema strategy failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            SchemaGraphError::driver(format!("no strategy available for {what}"), "schema")
        }))
    }

    fn overview(&self) -> Value {
        let entity_count = self.tolerant_field("node_count", ENTITY_COUNT_QUERY, "count", json!(0));
        let relationship_count =
            self.tolerant_field("relationship_count", RELATIONSHIP_COUNT_QUERY, "count", json!(0));
        let labels = self.tolerant_field("labels", LABELS_QUERY, "labels", json!([]));
        let types = self.tolerant_field("relationship_types", RELATIONSHIP_TYPES_QUERY, "types", json!([]));

        let count_of = |v: &Value| v.as_array().map_or(0, Vec::len);
        json!({
            "schema_type": SchemaKind::Overview.as_str(),
            "overview": {
                "total_entities": entity_count,
                "total_relationships": relationship_count,
                "entity_types": labels,
                "relationship_types": types,
                "entity_type_count": count_of(&labels),
                "relationship_type_count": count_of(&types),
            }
        })
    }

    /// Runs a single-value query. A failure yields `null`, an empty result
    /// yields `empty`.
    fn tolerant_field(&self, what: &str, query: &str, column: &str, empty: Value) -> Value {
        match self.query(query, &Params::new()) {
            Ok(rows) => rows
                .into_iter()
                .next()
                .and_then(|mut row| row.remove(column))
                .unwrap_or(empty),
            Err(e) => {
                warn!(what, error = %e, "overview sub-query failed");
                Value::Null
            }
        }
    }

    fn node_counts(&self) -> Result<Value> {
        let rows = self.run_strategies("node counts", NODE_COUNT_STRATEGIES)?;
        Ok(json!({
            "schema_type": SchemaKind::Nodes.as_str(),
            "entities": rows,
        }))
    }

    fn relationship_counts(&self) -> Result<Value> {
        let rows = self.run_strategies("relationship counts", RELATIONSHIP_COUNT_STRATEGIES)?;
        Ok(json!({
            "schema_type": SchemaKind::Relationships.as_str(),
            "relationships": rows,
        }))
    }

    fn properties(&self, node_label: Option<&str>) -> Result<Value> {
        match node_label {
            Some(label) => {
                let query = format!(
                    "MATCH (n:{}) WITH n LIMIT $sample \
                     UNWIND keys(n) AS prop \
                     RETURN DISTINCT prop AS property ORDER BY property",
                    quote_identifier(label)
                );
                let rows = self.query(&query, &params([("sample", json!(PROPERTY_SAMPLE_SIZE))]))?;
                let properties: Vec<Value> = rows
                    .into_iter()
                    .filter_map(|mut row| row.remove("property"))
                    .collect();
                Ok(json!({
                    "schema_type": SchemaKind::Properties.as_str(),
                    "entity_type": label,
                    "properties": properties,
                }))
            }
            None => {
                let rows = self.run_strategies("property keys", PROPERTY_STRATEGIES)?;
                Ok(json!({
                    "schema_type": SchemaKind::Properties.as_str(),
                    "entity_properties": rows,
                }))
            }
        }
    }

    fn sample_data(&self, limit: i64) -> Value {
        let bound = params([("limit", json!(limit))]);
        let sample = |what: &str, query: &str| match self.query(query, &bound) {
            Ok(rows) => json!(rows),
            Err(e) => {
                warn!(what, error = %e, "sample sub-query failed");
                json!([])
            }
        };
        json!({
            "schema_type": SchemaKind::SampleData.as_str(),
            "sample_entities": sample("sample_entities", SAMPLE_ENTITIES_QUERY),
            "sample_relationships": sample("sample_relationships", SAMPLE_RELATIONSHIPS_QUERY),
        })
    }
}

/// Reads the `limit` argument. Only `sample_data` uses it.
fn sample_limit(args: &Value) -> Result<i64> {
    let limit = arg_i64(args, "limit")?.unwrap_or(DEFAULT_SAMPLE_LIMIT);
    if limit <= 0 {
        return Err(SchemaGraphError::invalid_argument(
            "limit must be a positive integer",
        ));
    }
    Ok(limit)
}

impl Tool for SchemaTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute(&self, args: &Value) -> Result<Value> {
        let raw_kind = arg_str(args, "schema_type")
            .ok_or_else(|| SchemaGraphError::invalid_argument("schema_type parameter is required"))?;
        let kind = SchemaKind::from_str(raw_kind).ok_or_else(|| {
            SchemaGraphError::invalid_argument(format!("unknown schema_type: {raw_kind}"))
        })?;
        let node_label = arg_str(args, "node_label").filter(|s| !s.trim().is_empty());

        debug!(schema_type = kind.as_str(), ?node_label, "exploring schema");

        let (purpose, payload) = match kind {
            SchemaKind::Overview => (
                format!("{} SQL query generation", self.metadata.source_system),
                self.overview(),
            ),
            SchemaKind::Nodes => (
                format!("Identify {} entities for SQL generation", self.metadata.source_system),
                self.node_counts()?,
            ),
            SchemaKind::Relationships => (
                format!(
                    "Understand {} relationships for JOIN operations",
                    self.metadata.source_system
                ),
                self.relationship_counts()?,
            ),
            SchemaKind::Properties => (
                match node_label {
                    Some(label) => format!(
                        "{} {} properties for SQL generation",
                        self.metadata.source_system,
                        label.to_lowercase()
                    ),
                    None => format!(
                        "{} entity properties for SQL generation",
                        self.metadata.source_system
                    ),
                },
                self.properties(node_label)?,
            ),
            SchemaKind::SampleData => (
                format!(
                    "Sample {} schema elements for understanding structure",
                    self.metadata.source_system
                ),
                self.sample_data(sample_limit(args)?),
            ),
        };

        Ok(self.metadata.wrap(purpose, payload))
    }
}
