//! In-memory store backend.
//!
//! Writes are applied to a staged copy of the table which replaces the live
//! one only when the commit succeeds, so a failed write leaves no trace.
//! Used by the test suites of every crate in the workspace.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{match_filter, write_columns, StoreBackend, UpsertOutcome};
use crate::error::{StoreError, StoreResult};
use crate::value::{FieldValue, Record, TableShape, ID_COLUMN};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    rows: Vec<Record>,
    next_id: i64,
}

impl MemoryTable {
    fn insert(&mut self, record: &Record) -> Record {
        self.next_id += 1;
        let mut row = Record::new().with(ID_COLUMN, self.next_id);
        for (column, value) in write_columns(record) {
            row.set(column, value.clone());
        }
        self.rows.push(row.clone());
        row
    }
}

/// Backend holding every table in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<RwLock<HashMap<&'static str, MemoryTable>>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write's commit fail, exercising the rollback path.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Copy of every row in `table`, in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn commit(
        &self,
        shape: &TableShape,
        tables: &mut HashMap<&'static str, MemoryTable>,
        staged: MemoryTable,
    ) -> StoreResult<()> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::CommitFailed(format!(
                "injected failure committing {}",
                shape.table
            )));
        }
        check_unique(shape, &staged)?;
        tables.insert(shape.table, staged);
        Ok(())
    }
}

fn check_unique(shape: &TableShape, table: &MemoryTable) -> StoreResult<()> {
    for columns in shape.unique {
        let mut seen = HashSet::new();
        for row in &table.rows {
            let key: Option<Vec<&FieldValue>> = columns
                .iter()
                .map(|c| row.get(c).filter(|v| !v.is_null()))
                .collect();
            // Rows with a null in the key never conflict
            let Some(key) = key else { continue };
            if !seen.insert(format!("{:?}", key)) {
                return Err(StoreError::ConstraintViolation {
                    table: shape.table,
                    detail: format!("duplicate value for ({})", columns.join(", ")),
                });
            }
        }
    }
    Ok(())
}

fn row_id(shape: &TableShape, row: &Record) -> StoreResult<i64> {
    row.id()
        .ok_or_else(|| StoreError::Database(format!("row in {} has no id", shape.table)))
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn find(
        &self,
        shape: &TableShape,
        filter: &[(&'static str, FieldValue)],
    ) -> StoreResult<Vec<Record>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(shape.table)
            .map(|t| t.rows.iter().filter(|r| r.matches(filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert(
        &self,
        shape: &TableShape,
        record: &Record,
        match_keys: &[&'static str],
    ) -> StoreResult<UpsertOutcome> {
        let filter = match_filter(shape, record, match_keys)?;

        let mut tables = self.tables.write().await;
        let mut staged = tables.get(shape.table).cloned().unwrap_or_default();

        let outcome = match staged.rows.iter().position(|r| r.matches(&filter)) {
            Some(index) => {
                let row = &mut staged.rows[index];
                for (column, value) in write_columns(record) {
                    row.set(column, value.clone());
                }
                UpsertOutcome::Updated(row_id(shape, row)?)
            }
            None => {
                let row = staged.insert(record);
                UpsertOutcome::Inserted(row_id(shape, &row)?)
            }
        };

        self.commit(shape, &mut tables, staged)?;
        debug!(table = shape.table, id = outcome.id(), "Committed upsert");
        Ok(outcome)
    }

    async fn insert_if_absent(
        &self,
        shape: &TableShape,
        record: &Record,
        match_keys: &[&'static str],
    ) -> StoreResult<(Record, bool)> {
        let filter = match_filter(shape, record, match_keys)?;

        let mut tables = self.tables.write().await;
        let mut staged = tables.get(shape.table).cloned().unwrap_or_default();

        if let Some(existing) = staged.rows.iter().find(|r| r.matches(&filter)) {
            return Ok((existing.clone(), false));
        }

        let row = staged.insert(record);
        self.commit(shape, &mut tables, staged)?;
        Ok((row, true))
    }

    async fn count(&self, shape: &TableShape) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.get(shape.table).map_or(0, |t| t.rows.len() as u64))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Column, ColumnKind};

    const SHAPE: TableShape = TableShape {
        table: "thing",
        columns: &[
            Column::new("name", ColumnKind::Text),
            Column::new("size", ColumnKind::Integer),
        ],
        primary_key: &["name"],
        unique: &[&["name"]],
        foreign_keys: &[],
    };

    fn thing(name: &str, size: i64) -> Record {
        Record::new().with("name", name).with("size", size)
    }

    #[tokio::test]
    async fn test_insert_then_update() {
        let backend = MemoryBackend::new();

        let first = backend.upsert(&SHAPE, &thing("a", 1), &["name"]).await.unwrap();
        assert_eq!(first, UpsertOutcome::Inserted(1));

        let second = backend.upsert(&SHAPE, &thing("a", 2), &["name"]).await.unwrap();
        assert_eq!(second, UpsertOutcome::Updated(1));

        let rows = backend.rows("thing").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].int("size").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_table_untouched() {
        let backend = MemoryBackend::new();
        backend.upsert(&SHAPE, &thing("a", 1), &["name"]).await.unwrap();

        backend.fail_next_commit();
        let err = backend
            .upsert(&SHAPE, &thing("a", 5), &["name"])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CommitFailed(_)));
        assert_eq!(backend.rows("thing").await[0].int("size").unwrap(), 1);

        // The injected failure is one-shot
        backend.upsert(&SHAPE, &thing("b", 1), &["name"]).await.unwrap();
        assert_eq!(backend.count(&SHAPE).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unique_constraint_checked_at_commit() {
        let backend = MemoryBackend::new();
        backend.upsert(&SHAPE, &thing("a", 1), &["name"]).await.unwrap();

        // Matching on size misses the existing row, the insert then collides on name
        let err = backend
            .upsert(&SHAPE, &thing("a", 7), &["size"])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { .. }));
        assert_eq!(backend.count(&SHAPE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_if_absent() {
        let backend = MemoryBackend::new();
        let (row, created) = backend
            .insert_if_absent(&SHAPE, &thing("a", 1), &["name"])
            .await
            .unwrap();
        assert!(created);
        assert_eq!(row.id(), Some(1));

        let (row, created) = backend
            .insert_if_absent(&SHAPE, &thing("a", 9), &["name"])
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(row.int("size").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_filters_rows() {
        let backend = MemoryBackend::new();
        backend.upsert(&SHAPE, &thing("a", 1), &["name"]).await.unwrap();
        backend.upsert(&SHAPE, &thing("b", 1), &["name"]).await.unwrap();

        let found = backend
            .find(&SHAPE, &[("size", FieldValue::Int(1))])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(backend
            .find(&SHAPE, &[("name", FieldValue::from("z"))])
            .await
            .unwrap()
            .is_empty());
    }
}
