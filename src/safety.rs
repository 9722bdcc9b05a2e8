//! Read-only gate for caller-supplied Cypher.
//!
//! Every free-form query passes through [`ensure_read_only`] before it
//! reaches the graph store. The check runs on a normalized copy of the text:
//! comments removed, whitespace collapsed, uppercased. A query is accepted
//! only when it contains none of the [`FORBIDDEN_KEYWORDS`] and begins with
//! one of the [`ALLOWED_STARTS`].
//!
//! Keywords are matched on token boundaries, so `c.create_date` does not trip
//! `CREATE`, but any standalone occurrence anywhere in the text (including
//! inside string literals and after a `.`) rejects the query.

use thiserror::Error;

/// Mutating or administrative keywords that reject a query wherever they
/// appear. Multi-word entries come first so the reported keyword is the most
/// specific one.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "DETACH DELETE",
    "LOAD CSV",
    "CREATE",
    "DELETE",
    "REMOVE",
    "SET",
    "MERGE",
    "DROP",
    "ALTER",
    "CALL",
    "IMPORT",
    "EXPORT",
    "ADMIN",
    "DBMS",
    "TERMINATE",
    "KILL",
];

/// Clauses a read-only query may begin with.
pub const ALLOWED_STARTS: &[&str] = &[
    "OPTIONAL MATCH",
    "MATCH",
    "RETURN",
    "SHOW",
    "EXPLAIN",
    "PROFILE",
    "WITH",
    "UNWIND",
];

/// Reasons a query is refused by the gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SafetyViolation {
    #[error("query is empty")]
    Empty,

    #[error("query contains disallowed keyword: {0}. Only read-only queries are allowed")]
    ForbiddenKeyword(&'static str),

    #[error("query must start with a read-only operation (MATCH, RETURN, SHOW, EXPLAIN, PROFILE, WITH, UNWIND, OPTIONAL MATCH)")]
    DisallowedStart,
}

/// Checks that `query` is a read-only statement.
///
/// The deny-list check runs before the allowed-start check, so a query such
/// as `CREATE (n)` reports the `CREATE` keyword rather than its start.
pub fn ensure_read_only(query: &str) -> Result<(), SafetyViolation> {
    let normalized = normalize(query);
    if normalized.is_empty() {
        return Err(SafetyViolation::Empty);
    }

    if let Some(keyword) = FORBIDDEN_KEYWORDS
        .iter()
        .find(|kw| contains_token(&normalized, kw))
    {
        return Err(SafetyViolation::ForbiddenKeyword(keyword));
    }

    if !ALLOWED_STARTS
        .iter()
        .any(|start| starts_with_token(&normalized, start))
    {
        return Err(SafetyViolation::DisallowedStart);
    }

    Ok(())
}

/// Returns `true` if the query already carries its own `LIMIT` clause.
pub fn has_limit_clause(query: &str) -> bool {
    contains_token(&normalize(query), "LIMIT")
}

/// Strips `//` and `/* */` comments, collapses whitespace, and uppercases.
///
/// Comment markers inside quoted literals are left alone.
pub fn normalize(query: &str) -> String {
    strip_comments(query)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn strip_comments(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut chars = query.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && q != '`' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('\'' | '"' | '`', _) => {
                quote = Some(c);
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
                out.push(' ');
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Finds `token` in `haystack` where it is not glued to identifier characters.
fn contains_token(haystack: &str, token: &str) -> bool {
    haystack.match_indices(token).any(|(start, _)| {
        let end = start + token.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !is_word_char(c));
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !is_word_char(c));
        before_ok && after_ok
    })
}

fn starts_with_token(haystack: &str, token: &str) -> bool {
    haystack.starts_with(token)
        && haystack[token.len()..]
            .chars()
            .next()
            .is_none_or(|c| !is_word_char(c))
}

/// Returns at most `max_chars` characters of `query` for log and error output.
pub fn preview(query: &str, max_chars: usize) -> String {
    match query.char_indices().nth(max_chars) {
        None => query.to_string(),
        Some((end, _)) => format!("{}...", &query[..end]),
    }
}
