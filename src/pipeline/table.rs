//! Schema-first record tables.
//!
//! A [`Table`] is declared with its column list up front; rows are stored
//! column-aligned with that schema, so a row can never be missing a column
//! or carry one the schema does not know about.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput};

/// A single cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Ordering used by [`Table::sort_by`]. Numbers compare numerically across
    /// integer/real, text compares lexicographically. Values of unrelated
    /// kinds are considered equal so the stable sort keeps their input order.
    fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            },
        }
    }
}

impl fmt::Display for Value {
    /// Flat-file rendering: null is the empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Bool(b) => ToSqlOutput::from(*b),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(r) => ToSqlOutput::from(*r),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One entity, as a loose column -> value mapping.
///
/// Records are what the fetch stage produces; [`TableBuilder::build`] pins
/// them to a schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.fields.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Copy every field of `other` into this record, overwriting on clash.
    pub fn merge(&mut self, other: Record) {
        self.fields.extend(other.fields);
    }
}

/// Ordered list of column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub ascending: bool,
}

impl SortKey {
    pub fn ascending(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: true,
        }
    }

    pub fn descending(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }
}

/// Rows aligned to a fixed [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (`row`, `column`), `None` if either is out of range.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.schema.index_of(column)?;
        self.rows.get(row).map(|r| &r[index])
    }

    /// All values of one column, in row order.
    pub fn column(&self, column: &str) -> Option<Vec<&Value>> {
        let index = self.schema.index_of(column)?;
        Some(self.rows.iter().map(|r| &r[index]).collect())
    }

    /// Non-null text values of one column, in row order.
    pub fn column_strings(&self, column: &str) -> Vec<String> {
        self.column(column)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// Stable sort by `keys`, first key most significant. Nulls go last
    /// regardless of direction; unknown columns are ignored.
    pub fn sort_by(&mut self, keys: &[SortKey]) {
        let resolved: Vec<(usize, bool)> = keys
            .iter()
            .filter_map(|k| self.schema.index_of(&k.column).map(|i| (i, k.ascending)))
            .collect();

        self.rows.sort_by(|a, b| {
            for &(index, ascending) in &resolved {
                let ordering = match (&a[index], &b[index]) {
                    (Value::Null, Value::Null) => Ordering::Equal,
                    (Value::Null, _) => Ordering::Greater,
                    (_, Value::Null) => Ordering::Less,
                    (x, y) if ascending => x.compare(y),
                    (x, y) => y.compare(x),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

/// Assembles records into a [`Table`].
pub struct TableBuilder {
    name: String,
    schema: Schema,
    sort: Vec<SortKey>,
}

impl TableBuilder {
    pub fn new(name: &str, schema: Schema) -> Self {
        Self {
            name: name.to_string(),
            schema,
            sort: Vec::new(),
        }
    }

    pub fn sorted_by(mut self, keys: Vec<SortKey>) -> Self {
        self.sort = keys;
        self
    }

    /// Pin `records` to the schema: columns in schema order, absent fields
    /// as null, fields outside the schema dropped.
    pub fn build<I>(&self, records: I) -> Table
    where
        I: IntoIterator<Item = Record>,
    {
        let rows = records
            .into_iter()
            .map(|mut record| {
                self.schema
                    .columns()
                    .iter()
                    .map(|column| record.fields.remove(column).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        let mut table = Table {
            name: self.name.clone(),
            schema: self.schema.clone(),
            rows,
        };
        if !self.sort.is_empty() {
            table.sort_by(&self.sort);
        }
        table
    }
}
