//! Helpers for dynamically filtered queries
//!
//! List endpoints combine optional filters, so their SQL is assembled at
//! runtime. [`Filter`] collects `WHERE` clauses together with the values
//! bound to their placeholders, in order.

use chrono::{DateTime, Utc};

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Bool(bool),
    Time(DateTime<Utc>),
}

/// Bind every [`SqlParam`] of a slice onto a sqlx query, in order.
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut q = $query;
        for param in $params {
            q = match param {
                $crate::db::SqlParam::Text(v) => q.bind(v.clone()),
                $crate::db::SqlParam::Int(v) => q.bind(*v),
                $crate::db::SqlParam::Bool(v) => q.bind(*v),
                $crate::db::SqlParam::Time(v) => q.bind(*v),
            };
        }
        q
    }};
}
pub(crate) use bind_params;

/// Conjunction of `WHERE` clauses
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<String>,
    params: Vec<SqlParam>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause with its bound values; the clause must contain one `?`
    /// per value
    pub fn push(&mut self, clause: impl Into<String>, params: impl IntoIterator<Item = SqlParam>) {
        self.clauses.push(clause.into());
        self.params.extend(params);
    }

    /// Case-insensitive substring match against any of `columns`
    pub fn push_search(&mut self, columns: &[&str], term: &str) {
        let pattern = like_pattern(term);
        let clause = columns
            .iter()
            .map(|c| format!("LOWER({}) LIKE ? ESCAPE '{}'", c, LIKE_ESCAPE))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.push(
            format!("({})", clause),
            columns.iter().map(|_| SqlParam::Text(pattern.clone())),
        );
    }

    /// Rendered ` WHERE ...` fragment, empty when there are no clauses
    pub fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Escape character for `LIKE`; not a backslash, which MySQL string
/// literals would consume
pub const LIKE_ESCAPE: char = '!';

/// `term` with `%`, `_` and the escape character made literal
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// `%term%` lowercased, the term itself matched literally
pub fn like_pattern(term: &str) -> String {
    format!("%{}%", escape_like(&term.trim().to_lowercase()))
}

/// Placeholder list for an `IN (...)` clause
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Offset/limit pair of a paginated query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}
