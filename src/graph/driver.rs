use serde_json::{Map, Value};

use crate::errors::Result;

/// One result row: column alias to value.
pub type Record = Map<String, Value>;

/// Named query parameters bound by the store, never spliced into query text.
pub type Params = Map<String, Value>;

/// Query-execution capability against the graph store holding the schema.
///
/// Implementations hold one pooled connection for their whole lifetime; each
/// `run` call scopes its own session over that connection and releases it on
/// every exit path.
pub trait GraphDriver: Send + Sync {
    /// Runs `query` with `params` and returns every result row.
    fn run(&self, query: &str, params: &Params) -> Result<Vec<Record>>;

    /// Returns `Ok(())` if the store answers a trivial query.
    fn verify_connectivity(&self) -> Result<()> {
        self.run("RETURN 1 AS ok", &Params::new()).map(|_| ())
    }

    /// Returns the execution plan for `query` without running it.
    ///
    /// `query` must not carry its own `EXPLAIN` or `PROFILE` prefix. Stores
    /// that report plans as rows get them back as a JSON array.
    fn explain(&self, query: &str) -> Result<Value> {
        let rows = self.run(&format!("EXPLAIN {query}"), &Params::new())?;
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }

    /// Returns `true` if the APOC procedure library is installed.
    fn has_apoc(&self) -> bool {
        self.run("RETURN apoc.version() AS version", &Params::new())
            .is_ok()
    }
}

/// Builds a `Params` map from `(name, value)` pairs.
pub fn params<I, K>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Quotes a label or relationship type for safe interpolation into Cypher.
///
/// Labels cannot be passed as parameters, so they are wrapped in backticks
/// with embedded backticks doubled.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Table"), "`Table`");
        assert_eq!(quote_identifier("a`) DETACH DELETE (b"), "`a``) DETACH DELETE (b`");
    }

    #[test]
    fn test_params_builder() {
        let p = params([("limit", json!(10)), ("label", json!("Table"))]);
        assert_eq!(p["limit"], json!(10));
        assert_eq!(p["label"], json!("Table"));
    }
}
