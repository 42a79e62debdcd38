use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::Row;

#[derive(Clone, Debug, PartialEq)]
pub enum FilterOp {
    Eq(Value),
    Neq(Value),
    IsNull,
    NotNull,
    In(Vec<Value>),
}

/// A single column predicate. Multiple filters combine with AND.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    column: String,
    op: FilterOp,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq(value.into()))
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Neq(value.into()))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, FilterOp::IsNull)
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self::new(column, FilterOp::NotNull)
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            column,
            FilterOp::In(values.into_iter().map(Into::into).collect()),
        )
    }

    fn new(column: impl Into<String>, op: FilterOp) -> Self {
        Self {
            column: column.into(),
            op,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn op(&self) -> &FilterOp {
        &self.op
    }

    /// Evaluates the predicate with SQL semantics: comparisons against NULL never match.
    pub fn matches(&self, row: &Row) -> bool {
        let value = row.get(&self.column).unwrap_or(&Value::Null);
        match &self.op {
            FilterOp::IsNull => value.is_null(),
            FilterOp::NotNull => !value.is_null(),
            _ if value.is_null() => false,
            FilterOp::Eq(expected) => compare_values(value, expected) == Some(Ordering::Equal),
            FilterOp::Neq(expected) => {
                !expected.is_null() && compare_values(value, expected) != Some(Ordering::Equal)
            }
            FilterOp::In(candidates) => candidates
                .iter()
                .any(|candidate| compare_values(value, candidate) == Some(Ordering::Equal)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// Related rows attached to each result row under `alias`.
#[derive(Clone, Debug, PartialEq)]
pub enum Embed {
    /// The row of `table` whose `id` equals this row's `local_column`, or null.
    One {
        alias: String,
        table: String,
        local_column: String,
    },
    /// Rows of `table` whose `foreign_column` equals this row's `id`.
    Many {
        alias: String,
        table: String,
        foreign_column: String,
        columns: Vec<String>,
        filters: Vec<Filter>,
    },
    /// `[{"count": n}]` for the rows of `table` whose `foreign_column` equals this row's `id`.
    Count {
        alias: String,
        table: String,
        foreign_column: String,
    },
}

impl Embed {
    pub fn one(alias: &str, table: &str, local_column: &str) -> Self {
        Embed::One {
            alias: alias.to_owned(),
            table: table.to_owned(),
            local_column: local_column.to_owned(),
        }
    }

    pub fn many(alias: &str, table: &str, foreign_column: &str, columns: &[&str]) -> Self {
        Embed::Many {
            alias: alias.to_owned(),
            table: table.to_owned(),
            foreign_column: foreign_column.to_owned(),
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            filters: Vec::new(),
        }
    }

    pub fn count(alias: &str, table: &str, foreign_column: &str) -> Self {
        Embed::Count {
            alias: alias.to_owned(),
            table: table.to_owned(),
            foreign_column: foreign_column.to_owned(),
        }
    }

    /// Restricts the embedded rows of a `Many` embed; ignored for other kinds.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        if let Embed::Many { filters, .. } = &mut self {
            filters.push(filter);
        }
        self
    }

    pub fn alias(&self) -> &str {
        match self {
            Embed::One { alias, .. } | Embed::Many { alias, .. } | Embed::Count { alias, .. } => {
                alias
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    filters: Vec<Filter>,
    order: Vec<OrderBy>,
    offset: Option<usize>,
    limit: Option<usize>,
    embeds: Vec<Embed>,
}

impl SelectQuery {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            offset: None,
            limit: None,
            embeds: Vec::new(),
        }
    }

    /// Restricts the returned columns; no call means all columns.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| (*c).to_owned()).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn range(mut self, offset: usize, limit: usize) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn selected_columns(&self) -> &[String] {
        &self.columns
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order
    }

    pub fn offset_value(&self) -> Option<usize> {
        self.offset
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }
}

/// Orders two column values. Timestamps compare chronologically, strings
/// lexicographically, numbers numerically; mismatched kinds are unordered.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => {
            match (
                a.parse::<DateTime<Utc>>(),
                b.parse::<DateTime<Utc>>(),
            ) {
                (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                _ => Some(a.cmp(b)),
            }
        }
        _ => None,
    }
}
