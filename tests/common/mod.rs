#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use schemagraph::errors::{Result, SchemaGraphError};
use schemagraph::graph::{GraphDriver, Params, Record};
use serde_json::Value;

/// In-memory `GraphDriver` that answers queries from a script.
///
/// Each rule pairs a query fragment with a canned outcome; the first rule
/// whose fragment appears in the query wins. Unmatched queries fail.
#[derive(Default)]
pub struct ScriptedDriver {
    rules: Vec<(String, std::result::Result<Vec<Record>, String>)>,
    calls: Mutex<Vec<(String, Params)>>,
    plan: Option<Value>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that answers the connectivity and APOC probes.
    pub fn reachable(apoc: bool) -> Self {
        let driver = Self::new().on("RETURN 1 AS ok", serde_json::json!([{"ok": 1}]));
        if apoc {
            driver.on("apoc.version()", serde_json::json!([{"version": "5.20.0"}]))
        } else {
            driver.fail_on("apoc.version()", "Unknown function 'apoc.version'")
        }
    }

    /// Answers queries containing `fragment` with `rows` (a JSON array of objects).
    pub fn on(mut self, fragment: &str, rows: Value) -> Self {
        let records = rows
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default();
        self.rules.push((fragment.to_string(), Ok(records)));
        self
    }

    /// Fails queries containing `fragment` with `message`.
    pub fn fail_on(mut self, fragment: &str, message: &str) -> Self {
        self.rules
            .push((fragment.to_string(), Err(message.to_string())));
        self
    }

    /// Answers `explain` with `plan` instead of running an `EXPLAIN` query.
    pub fn with_plan(mut self, plan: Value) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every query run so far, in order.
    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().unwrap().clone()
    }

    /// Queries run so far that contain `fragment`.
    pub fn calls_matching(&self, fragment: &str) -> Vec<(String, Params)> {
        self.calls()
            .into_iter()
            .filter(|(q, _)| q.contains(fragment))
            .collect()
    }
}

impl GraphDriver for ScriptedDriver {
    fn run(&self, query: &str, params: &Params) -> Result<Vec<Record>> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), params.clone()));

        match self.rules.iter().find(|(fragment, _)| query.contains(fragment.as_str())) {
            Some((_, Ok(rows))) => Ok(rows.clone()),
            Some((_, Err(message))) => Err(SchemaGraphError::driver(message.clone(), "run")),
            None => Err(SchemaGraphError::driver(
                format!("no scripted response for: {query}"),
                "run",
            )),
        }
    }

    fn explain(&self, query: &str) -> Result<Value> {
        let statement = format!("EXPLAIN {query}");
        match &self.plan {
            Some(plan) => {
                self.calls.lock().unwrap().push((statement, Params::new()));
                Ok(plan.clone())
            }
            None => {
                let rows = self.run(&statement, &Params::new())?;
                Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
            }
        }
    }
}
