//! View query options and row selection.

use std::{cmp::Ordering, fmt, sync::Arc};
use serde_json::Value;

use docproxy_core::{
    Options,
    error::{DocError, DocResult, Status},
};

use crate::collation::collate;

/// A map function: emits `(key, value)` pairs for one document.
pub type MapFn = dyn Fn(&Value) -> Vec<(Value, Value)> + Send + Sync;

/// A registered view.
#[derive(Clone)]
pub(crate) struct View(pub(crate) Arc<MapFn>);

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("View(..)")
    }
}

/// One row of an index, before selection.
#[derive(Debug, Clone)]
pub(crate) struct IndexRow {
    pub id: String,
    pub key: Value,
    pub value: Value,
    pub doc: Option<Value>,
}

/// The subset of query options understood by the in-memory client.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryOptions {
    pub include_docs: bool,
    pub descending: bool,
    pub limit: Option<usize>,
    pub skip: usize,
    pub key: Option<Value>,
    pub start_key: Option<Value>,
    pub end_key: Option<Value>,
    pub inclusive_end: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            include_docs: false,
            descending: false,
            limit: None,
            skip: 0,
            key: None,
            start_key: None,
            end_key: None,
            inclusive_end: true,
        }
    }
}

fn invalid(name: &str) -> DocError {
    DocError::status_error(
        Status::BadRequest,
        format!("Invalid value for `{name}`."),
    )
}

fn flag(options: &Options, name: &str, default: bool) -> DocResult<bool> {
    match options.get(name) {
        None => Ok(default),
        Some(Value::Bool(value)) => Ok(*value),
        Some(_) => Err(invalid(name)),
    }
}

fn count(options: &Options, name: &str) -> DocResult<Option<usize>> {
    match options.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| invalid(name)),
    }
}

fn either<'a>(options: &'a Options, name: &str, alias: &str) -> Option<&'a Value> {
    options.get(name).or_else(|| options.get(alias))
}

impl QueryOptions {
    pub fn parse(options: &Options) -> DocResult<Self> {
        Ok(Self {
            include_docs: flag(options, "include_docs", false)?,
            descending: flag(options, "descending", false)?,
            limit: count(options, "limit")?,
            skip: count(options, "skip")?.unwrap_or(0),
            key: options.get("key").cloned(),
            start_key: either(options, "startkey", "start_key").cloned(),
            end_key: either(options, "endkey", "end_key").cloned(),
            inclusive_end: flag(options, "inclusive_end", true)?,
        })
    }

    /// Orders `rows` by key (then id), applies the key range, skip and limit.
    ///
    /// Returns the selected rows and the offset of the first one in the index.
    pub fn select(&self, mut rows: Vec<IndexRow>) -> (Vec<IndexRow>, i64) {
        rows.sort_by(|a, b| collate(&a.key, &b.key).then_with(|| a.id.cmp(&b.id)));

        if self.descending {
            rows.reverse();
        }

        // Key ordering in the direction of iteration.
        let directed = |a: &Value, b: &Value| {
            let ordering = collate(a, b);
            if self.descending { ordering.reverse() } else { ordering }
        };

        // An exact key is the inclusive range `[key, key]` and overrides the
        // start and end keys.
        let start_key = self.key.as_ref().or(self.start_key.as_ref());
        let (end_key, inclusive_end) = match &self.key {
            Some(key) => (Some(key), true),
            None => (self.end_key.as_ref(), self.inclusive_end),
        };

        let before_start = |row: &IndexRow| match start_key {
            Some(start) => directed(&row.key, start) == Ordering::Less,
            None => false,
        };

        let before_end = |row: &IndexRow| match end_key {
            Some(end) => match directed(&row.key, end) {
                Ordering::Less => true,
                Ordering::Equal => inclusive_end,
                Ordering::Greater => false,
            },
            None => true,
        };

        let leading = rows.iter().take_while(|row| before_start(*row)).count();

        let selected = rows
            .into_iter()
            .skip(leading)
            .take_while(before_end)
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect::<Vec<_>>();

        (selected, (leading + self.skip) as i64)
    }
}
