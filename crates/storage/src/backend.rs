//! Backend abstraction for the upsert store.

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::value::{FieldValue, Record, TableShape, ID_COLUMN};

/// Result of a successful upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated(i64),
}

impl UpsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            UpsertOutcome::Inserted(id) | UpsertOutcome::Updated(id) => *id,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            UpsertOutcome::Inserted(_) => "Added",
            UpsertOutcome::Updated(_) => "Updated",
        }
    }
}

/// Storage operations a [`crate::Store`] is built on.
///
/// Each write method runs in its own transaction: either it commits
/// completely or the table is left as it was.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// All rows whose columns equal every value in `filter`.
    async fn find(
        &self,
        shape: &TableShape,
        filter: &[(&'static str, FieldValue)],
    ) -> StoreResult<Vec<Record>>;

    /// Overwrite the row matching `match_keys`, or insert a new one.
    async fn upsert(
        &self,
        shape: &TableShape,
        record: &Record,
        match_keys: &[&'static str],
    ) -> StoreResult<UpsertOutcome>;

    /// Return the row matching `match_keys`, inserting `record` if none does.
    /// The flag is true when a row was created.
    async fn insert_if_absent(
        &self,
        shape: &TableShape,
        record: &Record,
        match_keys: &[&'static str],
    ) -> StoreResult<(Record, bool)>;

    async fn count(&self, shape: &TableShape) -> StoreResult<u64>;

    fn name(&self) -> &'static str;
}

/// Build the equality filter for `match_keys` from `record`.
pub fn match_filter(
    shape: &TableShape,
    record: &Record,
    match_keys: &[&'static str],
) -> StoreResult<Vec<(&'static str, FieldValue)>> {
    match_keys
        .iter()
        .map(|&key| match record.get(key) {
            Some(value) if !value.is_null() => Ok((key, value.clone())),
            _ => Err(StoreError::MissingMatchKey {
                table: shape.table,
                column: key,
            }),
        })
        .collect()
}

/// Columns written by an insert or full replace. The id is never written.
pub fn write_columns(record: &Record) -> Vec<(&'static str, &FieldValue)> {
    record.iter().filter(|(name, _)| *name != ID_COLUMN).collect()
}
