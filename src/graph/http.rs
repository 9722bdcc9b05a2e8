//! Graph driver speaking the Neo4j HTTP transactional API.
//!
//! Every query is posted as a single auto-commit transaction to
//! `{uri}/db/{database}/tx/commit`. The `ureq::Agent` created at construction
//! keeps a connection pool that all calls share.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use ureq::Agent;

use crate::config::Config;
use crate::errors::{Result, SchemaGraphError};
use crate::safety::preview;

use super::driver::{GraphDriver, Params, Record};

/// Longest query text echoed into error messages.
const QUERY_PREVIEW_CHARS: usize = 100;

/// `GraphDriver` backed by a pooled HTTP agent.
pub struct HttpGraphDriver {
    agent: Agent,
    endpoint: String,
    auth_header: String,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
    /// Present for `EXPLAIN` and `PROFILE` statements.
    #[serde(default)]
    plan: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl HttpGraphDriver {
    /// Creates a driver for the store described by `config`.
    ///
    /// No request is made here; use `verify_connectivity` to probe the store.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.request_timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        let credentials = format!("{}:{}", config.neo4j_user, config.neo4j_password);
        Ok(Self {
            agent,
            endpoint: format!(
                "{}/db/{}/tx/commit",
                config.neo4j_uri.trim_end_matches('/'),
                config.neo4j_database
            ),
            auth_header: format!("Basic {}", STANDARD.encode(credentials)),
        })
    }

    /// Returns the transaction endpoint queries are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts one statement and returns its decoded result, if any.
    fn commit(&self, query: &str, params: &Params) -> Result<Option<TxResult>> {
        let body = json!({
            "statements": [{
                "statement": query,
                "parameters": params,
                "resultDataContents": ["row"],
            }]
        });

        let mut response = self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", self.auth_header.as_str())
            .header("Accept", "application/json")
            .send_json(&body)
            .map_err(|e| {
                SchemaGraphError::driver(
                    format!("request failed: {e} (query: {})", preview(query, QUERY_PREVIEW_CHARS)),
                    "run",
                )
            })?;

        let status = response.status();
        let tx: TxResponse = response.body_mut().read_json().map_err(|e| {
            SchemaGraphError::driver(
                format!("unreadable response (HTTP {status}): {e}"),
                "run",
            )
        })?;

        first_result(tx, status.as_u16())
    }
}

impl GraphDriver for HttpGraphDriver {
    fn run(&self, query: &str, params: &Params) -> Result<Vec<Record>> {
        Ok(self
            .commit(query, params)?
            .map(rows_to_records)
            .unwrap_or_default())
    }

    fn explain(&self, query: &str) -> Result<Value> {
        let result = self.commit(&format!("EXPLAIN {query}"), &Params::new())?;
        Ok(plan_of(result))
    }
}

fn first_result(tx: TxResponse, status: u16) -> Result<Option<TxResult>> {
    if let Some(err) = tx.errors.first() {
        return Err(SchemaGraphError::driver(
            format!("{}: {}", err.code, err.message),
            "run",
        ));
    }
    if !(200..300).contains(&status) {
        return Err(SchemaGraphError::driver(
            format!("store responded with HTTP {status}"),
            "run",
        ));
    }
    Ok(tx.results.into_iter().next())
}

/// The plan attached to an `EXPLAIN` result, `null` if the store sent none.
fn plan_of(result: Option<TxResult>) -> Value {
    result.and_then(|r| r.plan).unwrap_or(Value::Null)
}

fn rows_to_records(result: TxResult) -> Vec<Record> {
    result
        .data
        .into_iter()
        .map(|row| result.columns.iter().cloned().zip(row.row).collect())
        .collect()
}
