mod common;

use common::ScriptedDriver;
use schemagraph::mcp::tools::schema::SCHEMA_TOOL_NAME;
use schemagraph::mcp::{SchemaTool, SourceMetadata, Tool};
use serde_json::json;

fn tool(driver: &std::sync::Arc<ScriptedDriver>) -> SchemaTool {
    SchemaTool::new(driver.clone(), SourceMetadata::default())
}

#[test]
fn test_descriptor_declares_schema_type_enum() {
    let driver = ScriptedDriver::reachable(false).into_arc();
    let t = tool(&driver);
    assert_eq!(t.name(), SCHEMA_TOOL_NAME);

    let schema = t.descriptor().input_schema();
    assert_eq!(schema["required"], json!(["schema_type"]));
    assert_eq!(
        schema["properties"]["schema_type"]["enum"],
        json!(["overview", "nodes", "relationships", "properties", "sample_data"])
    );
}

#[test]
fn test_construction_probes_apoc() {
    let with = ScriptedDriver::reachable(true).into_arc();
    assert_eq!(tool(&with).apoc_available(), Some(true));

    let without = ScriptedDriver::reachable(false).into_arc();
    assert_eq!(tool(&without).apoc_available(), Some(false));

    let down = ScriptedDriver::new().into_arc();
    assert_eq!(tool(&down).apoc_available(), None);
}

#[test]
fn test_overview_collects_all_fields() {
    let driver = ScriptedDriver::reachable(false)
        .on("MATCH (n) RETURN count(n)", json!([{"count": 120}]))
        .on("MATCH ()-[r]->() RETURN count(r)", json!([{"count": 240}]))
        .on("collect(label)", json!([{"labels": ["Table", "Column"]}]))
        .on("collect(relationshipType)", json!([{"types": ["HAS_COLUMN"]}]))
        .into_arc();

    let out = tool(&driver).execute(&json!({"schema_type": "overview"})).unwrap();
    assert_eq!(out["database_type"], "PostgreSQL");
    assert_eq!(out["storage_type"], "Neo4j");
    assert_eq!(out["schema_type"], "overview");
    assert_eq!(out["overview"]["total_entities"], 120);
    assert_eq!(out["overview"]["total_relationships"], 240);
    assert_eq!(out["overview"]["entity_types"], json!(["Table", "Column"]));
    assert_eq!(out["overview"]["entity_type_count"], 2);
    assert_eq!(out["overview"]["relationship_type_count"], 1);
}

#[test]
fn test_overview_tolerates_failed_sub_queries() {
    let driver = ScriptedDriver::reachable(false)
        .on("MATCH (n) RETURN count(n)", json!([{"count": 7}]))
        .fail_on("MATCH ()-[r]->()", "timeout")
        .fail_on("db.labels()", "procedure not allowed")
        .on("collect(relationshipType)", json!([{"types": []}]))
        .into_arc();

    let out = tool(&driver).execute(&json!({"schema_type": "overview"})).unwrap();
    assert_eq!(out["overview"]["total_entities"], 7);
    assert!(out["overview"]["total_relationships"].is_null());
    assert!(out["overview"]["entity_types"].is_null());
    assert_eq!(out["overview"]["entity_type_count"], 0);
    assert_eq!(out["overview"]["relationship_types"], json!([]));
}

#[test]
fn test_node_counts_prefer_apoc() {
    let driver = ScriptedDriver::reachable(true)
        .on("apoc.cypher.run", json!([{"label": "Column", "count": 90}]))
        .into_arc();

    let out = tool(&driver).execute(&json!({"schema_type": "nodes"})).unwrap();
    assert_eq!(out["entities"], json!([{"label": "Column", "count": 90}]));
    assert!(driver.calls_matching("WHERE label IN labels(n)").is_empty());
}

#[test]
fn test_node_counts_fall_back_to_portable_cypher() {
    let driver = ScriptedDriver::reachable(true)
        .fail_on("apoc.cypher.run", "There is no procedure with the name `apoc.cypher.run`")
        .on("WHERE label IN labels(n)", json!([{"label": "Table", "count": 15}]))
        .into_arc();

    let out = tool(&driver).execute(&json!({"schema_type": "nodes"})).unwrap();
    assert_eq!(out["entities"][0]["count"], 15);
    assert_eq!(driver.calls_matching("apoc.cypher.run").len(), 1);
}

#[test]
fn test_node_counts_fall_back_to_zero_filled() {
    let driver = ScriptedDriver::reachable(true)
        .fail_on("apoc.cypher.run", "missing plugin")
        .fail_on("WHERE label IN labels(n)", "subqueries unsupported")
        .on("0 AS count", json!([{"label": "Index", "count": 0}]))
        .into_arc();

    let out = tool(&driver).execute(&json!({"schema_type": "nodes"})).unwrap();
    assert_eq!(out["entities"], json!([{"label": "Index", "count": 0}]));
}

#[test]
fn test_known_missing_apoc_skips_first_strategy() {
    let driver = ScriptedDriver::reachable(false)
        .on("WHERE type(r) = relationshipType", json!([{"relationshipType": "REFERENCES", "count": 3}]))
        .into_arc();

    let out = tool(&driver).execute(&json!({"schema_type": "relationships"})).unwrap();
    assert_eq!(out["relationships"][0]["relationshipType"], "REFERENCES");
    assert!(driver.calls_matching("apoc.cypher.run").is_empty());
}

#[test]
fn test_all_strategies_failing_is_an_error() {
    let driver = ScriptedDriver::reachable(false)
        .fail_on("db.relationshipTypes()", "store unavailable")
        .into_arc();

    let err = tool(&driver)
        .execute(&json!({"schema_type": "relationships"}))
        .unwrap_err();
    assert!(err.to_string().contains("store unavailable"));
}

#[test]
fn test_properties_for_one_label_quotes_identifier() {
    let driver = ScriptedDriver::reachable(false)
        .on("UNWIND keys(n)", json!([{"property": "data_type"}, {"property": "table_name"}]))
        .into_arc();

    let out = tool(&driver)
        .execute(&json!({"schema_type": "properties", "node_label": "Column"}))
        .unwrap();
    assert_eq!(out["entity_type"], "Column");
    assert_eq!(out["properties"], json!(["data_type", "table_name"]));

    let calls = driver.calls_matching("UNWIND keys(n)");
    assert!(calls[0].0.contains("MATCH (n:`Column`)"));
    assert_eq!(calls[0].1["sample"], json!(100));
}

#[test]
fn test_properties_without_label_uses_strategies() {
    let driver = ScriptedDriver::reachable(false)
        .on("collect(prop) AS properties", json!([{"label": "Table", "properties": ["table_name"]}]))
        .into_arc();

    let out = tool(&driver).execute(&json!({"schema_type": "properties"})).unwrap();
    assert_eq!(out["entity_properties"][0]["label"], "Table");
}

#[test]
fn test_sample_data_binds_limit_and_tolerates_failure() {
    let driver = ScriptedDriver::reachable(false)
        .on("labels(n) AS labels", json!([{"labels": ["Table"], "properties": ["table_name"]}]))
        .fail_on("MATCH (a)-[r]->(b)", "boom")
        .into_arc();

    let out = tool(&driver)
        .execute(&json!({"schema_type": "sample_data", "limit": 5}))
        .unwrap();
    assert_eq!(out["sample_entities"][0]["labels"], json!(["Table"]));
    assert_eq!(out["sample_relationships"], json!([]));

    let calls = driver.calls_matching("labels(n) AS labels");
    assert_eq!(calls[0].1["limit"], json!(5));
}

#[test]
fn test_rejects_non_positive_limit() {
    let driver = ScriptedDriver::reachable(false).into_arc();
    let err = tool(&driver)
        .execute(&json!({"schema_type": "sample_data", "limit": 0}))
        .unwrap_err();
    assert!(err.to_string().contains("positive integer"));
}

#[test]
fn test_sample_data_rejects_limit_beyond_i64() {
    let driver = ScriptedDriver::reachable(false)
        .on("labels(n) AS labels", json!([]))
        .on("MATCH (a)-[r]->(b)", json!([]))
        .into_arc();
    let err = tool(&driver)
        .execute(&json!({"schema_type": "sample_data", "limit": u64::MAX}))
        .unwrap_err();
    assert!(err.to_string().contains("limit"));
    assert!(driver.calls_matching("labels(n) AS labels").is_empty());
}

#[test]
fn test_limit_ignored_outside_sample_data() {
    let driver = ScriptedDriver::reachable(false)
        .on("MATCH (n) RETURN count(n)", json!([{"count": 3}]))
        .on("MATCH ()-[r]->() RETURN count(r)", json!([{"count": 2}]))
        .on("collect(label)", json!([{"labels": ["Table"]}]))
        .on("collect(relationshipType)", json!([{"types": ["HAS_COLUMN"]}]))
        .into_arc();

    let out = tool(&driver)
        .execute(&json!({"schema_type": "overview", "limit": 0}))
        .unwrap();
    assert_eq!(out["overview"]["total_entities"], 3);
}
