//! Access to the graph store that holds the extracted relational schema.

/// Driver contract shared by every tool.
pub mod driver;

/// Neo4j HTTP transactional API driver.
pub mod http;

pub use driver::{params, quote_identifier, GraphDriver, Params, Record};
pub use http::HttpGraphDriver;
