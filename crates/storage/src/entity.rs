//! The [`Entity`] trait: a struct projected onto a table.

use crate::error::StoreResult;
use crate::value::{Record, TableShape};

/// A row type with a statically declared table shape.
///
/// `to_values` is the projection: only the columns it returns are written,
/// so an entity can never leak fields the table does not declare.
pub trait Entity: Sized + Send + Sync {
    const SHAPE: TableShape;

    /// Surrogate key, `None` until the row has been stored.
    fn id(&self) -> Option<i64>;

    fn to_values(&self) -> Record;

    fn from_values(record: &Record) -> StoreResult<Self>;
}
