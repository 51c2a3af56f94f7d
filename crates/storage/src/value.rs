//! Column values, records and static table shapes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult};

/// Name of the surrogate key column every table carries.
pub const ID_COLUMN: &str = "id";

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Timestamp,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "BIGINT",
            ColumnKind::Float => "DOUBLE PRECISION",
            ColumnKind::Text => "TEXT",
            ColumnKind::Timestamp => "TIMESTAMPTZ",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Text => "text",
            ColumnKind::Timestamp => "timestamp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Statically declared layout of a table.
///
/// `columns` lists every column except the surrogate `id`.
#[derive(Debug, Clone, Copy)]
pub struct TableShape {
    pub table: &'static str,
    pub columns: &'static [Column],
    /// Columns used to match rows when an upsert names no match keys.
    pub primary_key: &'static [&'static str],
    /// Column sets that must be unique across rows.
    pub unique: &'static [&'static [&'static str]],
    /// `(column, referenced table)` pairs.
    pub foreign_keys: &'static [(&'static str, &'static str)],
}

impl TableShape {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        if name == ID_COLUMN {
            return Some(ColumnKind::Integer);
        }
        self.column(name).map(|c| c.kind)
    }

    /// Map a caller-supplied column name onto the declared one.
    pub fn resolve(&self, name: &str) -> StoreResult<&'static str> {
        if name == ID_COLUMN {
            return Ok(ID_COLUMN);
        }
        self.column(name)
            .map(|c| c.name)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: self.table,
                column: name.to_string(),
            })
    }

    pub fn resolve_all(&self, names: &[&str]) -> StoreResult<Vec<&'static str>> {
        names.iter().map(|name| self.resolve(name)).collect()
    }

    /// Check every value in `record` against its column's declared kind.
    pub fn check_record(&self, record: &Record) -> StoreResult<()> {
        for (name, value) in record.iter() {
            let kind = self.kind_of(name).ok_or_else(|| StoreError::UnknownColumn {
                table: self.table,
                column: name.to_string(),
            })?;
            if !value.fits(kind) {
                return Err(StoreError::TypeMismatch {
                    column: format!("{}.{}", self.table, name),
                    expected: kind.name(),
                });
            }
        }
        Ok(())
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Null fits any column.
    pub fn fits(&self, kind: ColumnKind) -> bool {
        matches!(
            (self, kind),
            (FieldValue::Null, _)
                | (FieldValue::Int(_), ColumnKind::Integer)
                | (FieldValue::Float(_), ColumnKind::Float)
                | (FieldValue::Text(_), ColumnKind::Text)
                | (FieldValue::Timestamp(_), ColumnKind::Timestamp)
        )
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(v.into())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

/// A row as a column → value map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(BTreeMap<&'static str, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &'static str, value: impl Into<FieldValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<FieldValue>) {
        self.0.insert(column, value.into());
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.0.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn id(&self) -> Option<i64> {
        match self.get(ID_COLUMN) {
            Some(FieldValue::Int(id)) => Some(*id),
            _ => None,
        }
    }

    /// True when every `(column, value)` in `filter` is present and equal.
    pub fn matches(&self, filter: &[(&'static str, FieldValue)]) -> bool {
        filter
            .iter()
            .all(|(column, value)| self.get(column) == Some(value))
    }

    pub fn int(&self, column: &str) -> StoreResult<i64> {
        match self.get(column) {
            Some(FieldValue::Int(v)) => Ok(*v),
            _ => Err(mismatch(column, "integer")),
        }
    }

    pub fn opt_int(&self, column: &str) -> StoreResult<Option<i64>> {
        match self.get(column) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Int(v)) => Ok(Some(*v)),
            _ => Err(mismatch(column, "integer")),
        }
    }

    pub fn float(&self, column: &str) -> StoreResult<f64> {
        match self.get(column) {
            Some(FieldValue::Float(v)) => Ok(*v),
            _ => Err(mismatch(column, "float")),
        }
    }

    pub fn text(&self, column: &str) -> StoreResult<String> {
        match self.get(column) {
            Some(FieldValue::Text(v)) => Ok(v.clone()),
            _ => Err(mismatch(column, "text")),
        }
    }

    pub fn opt_text(&self, column: &str) -> StoreResult<Option<String>> {
        match self.get(column) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Text(v)) => Ok(Some(v.clone())),
            _ => Err(mismatch(column, "text")),
        }
    }

    pub fn timestamp(&self, column: &str) -> StoreResult<DateTime<Utc>> {
        match self.get(column) {
            Some(FieldValue::Timestamp(v)) => Ok(*v),
            _ => Err(mismatch(column, "timestamp")),
        }
    }
}

fn mismatch(column: &str, expected: &'static str) -> StoreError {
    StoreError::TypeMismatch {
        column: column.to_string(),
        expected,
    }
}

/// Equality filter built from caller-supplied column names.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    terms: Vec<(String, FieldValue)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.terms.push((column.to_string(), value.into()));
        self
    }

    /// Resolve column names against `shape`.
    pub fn resolve(&self, shape: &TableShape) -> StoreResult<Vec<(&'static str, FieldValue)>> {
        self.terms
            .iter()
            .map(|(column, value)| Ok((shape.resolve(column)?, value.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPE: TableShape = TableShape {
        table: "widget",
        columns: &[
            Column::new("name", ColumnKind::Text),
            Column::new("size", ColumnKind::Integer),
        ],
        primary_key: &[ID_COLUMN],
        unique: &[&["name"]],
        foreign_keys: &[],
    };

    #[test]
    fn test_resolve_columns() {
        assert_eq!(SHAPE.resolve("name").unwrap(), "name");
        assert_eq!(SHAPE.resolve("id").unwrap(), "id");
        assert_eq!(
            SHAPE.resolve("colour"),
            Err(StoreError::UnknownColumn {
                table: "widget",
                column: "colour".to_string()
            })
        );
    }

    #[test]
    fn test_check_record_kinds() {
        let ok = Record::new().with("name", "a").with("size", 3i64);
        assert!(SHAPE.check_record(&ok).is_ok());

        let nulls = Record::new().with("name", None::<String>);
        assert!(SHAPE.check_record(&nulls).is_ok());

        let bad = Record::new().with("size", "three");
        assert!(matches!(
            SHAPE.check_record(&bad),
            Err(StoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_record_matches() {
        let record = Record::new().with("name", "a").with("size", 3i64);
        assert!(record.matches(&[("name", FieldValue::from("a"))]));
        assert!(!record.matches(&[("name", FieldValue::from("b"))]));
        assert!(!record.matches(&[("missing", FieldValue::Int(1))]));
        assert!(record.matches(&[]));
    }

    #[test]
    fn test_typed_getters() {
        let record = Record::new()
            .with("id", 7i64)
            .with("name", "a")
            .with("label", FieldValue::Null);
        assert_eq!(record.id(), Some(7));
        assert_eq!(record.text("name").unwrap(), "a");
        assert_eq!(record.opt_text("label").unwrap(), None);
        assert!(record.int("name").is_err());
    }

    #[test]
    fn test_criteria_resolution() {
        let criteria = Criteria::new().eq("name", "a");
        assert_eq!(
            criteria.resolve(&SHAPE).unwrap(),
            vec![("name", FieldValue::from("a"))]
        );
        assert!(Criteria::new().eq("nope", 1i64).resolve(&SHAPE).is_err());
    }
}
