//! Builds the parameterized SELECT used to list songs.
//!
//! Every constraint present in the filter appends one predicate and one
//! positional parameter, so the statement only grows with the fields that
//! were actually supplied.

use super::models::{SongFilter, STORED_DATE_FORMAT};
use super::trait_def::SongStoreError;
use rusqlite::types::Value;

pub(super) const SELECT_SONGS: &str = "SELECT s.id, s.title, g.name, s.release_date, s.song_text, s.link \
     FROM songs s JOIN groups g ON g.id = s.group_id";

#[derive(Debug, PartialEq)]
pub struct FilterQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

struct QueryBuilder {
    predicates: Vec<String>,
    params: Vec<Value>,
}

impl QueryBuilder {
    fn new() -> Self {
        Self {
            predicates: Vec::with_capacity(5),
            params: Vec::new(),
        }
    }

    fn next_placeholder(&self) -> String {
        format!("?{}", self.params.len() + 1)
    }

    fn push(&mut self, predicate: impl FnOnce(&str) -> String, value: Value) {
        let placeholder = self.next_placeholder();
        self.predicates.push(predicate(&placeholder));
        self.params.push(value);
    }

    fn push_text(&mut self, column: &str, value: &Option<String>) {
        if let Some(value) = value {
            self.push(
                |p| format!("{} = {}", column, p),
                Value::Text(value.clone()),
            );
        }
    }
}

/// Translates `filter` into SQL plus its bound parameters.
///
/// Negative `limit` or `offset` values are rejected here, before any
/// statement reaches the database.
pub fn build_filter_query(filter: &SongFilter) -> Result<FilterQuery, SongStoreError> {
    if filter.limit < 0 {
        return Err(SongStoreError::InvalidFilter(format!(
            "limit must be non-negative, got {}",
            filter.limit
        )));
    }
    if filter.offset < 0 {
        return Err(SongStoreError::InvalidFilter(format!(
            "offset must be non-negative, got {}",
            filter.offset
        )));
    }

    let mut builder = QueryBuilder::new();
    builder.push_text("s.title", &filter.title);
    builder.push_text("g.name", &filter.group);
    if let Some(date) = filter.release_date {
        builder.push(
            |p| format!("s.release_date = {}", p),
            Value::Text(date.format(STORED_DATE_FORMAT).to_string()),
        );
    }
    if let Some(text) = &filter.text {
        // instr() keeps '%' and '_' in user input literal, unlike LIKE.
        builder.push(
            |p| format!("instr(s.song_text, {}) > 0", p),
            Value::Text(text.clone()),
        );
    }
    builder.push_text("s.link", &filter.link);

    let mut sql = String::from(SELECT_SONGS);
    if !builder.predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&builder.predicates.join(" AND "));
    }
    sql.push_str(" ORDER BY s.id");

    // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
    if filter.limit > 0 || filter.offset > 0 {
        let limit = if filter.limit > 0 { filter.limit } else { -1 };
        sql.push_str(&format!(" LIMIT {}", builder.next_placeholder()));
        builder.params.push(Value::Integer(limit));
    }
    if filter.offset > 0 {
        sql.push_str(&format!(" OFFSET {}", builder.next_placeholder()));
        builder.params.push(Value::Integer(filter.offset));
    }

    Ok(FilterQuery {
        sql,
        params: builder.params,
    })
}
