//! Normalized entity storage for the snapshot ingest pipeline.
//!
//! Provides:
//! - Statically declared table shapes ([`TableShape`]) and the [`Entity`]
//!   trait that projects a struct onto one
//! - An idempotent match-or-create [`Store`] with per-call transactions
//! - PostgreSQL and in-memory backends behind [`StoreBackend`]

pub mod backend;
pub mod entity;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;
pub mod value;

pub use backend::{StoreBackend, UpsertOutcome};
pub use entity::Entity;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryBackend;
pub use models::{Device, Image, Instrument, Station, StationInstrument, IMAGE_KEY};
pub use postgres::{DatabaseConfig, PgBackend};
pub use store::Store;
pub use value::{Column, ColumnKind, Criteria, FieldValue, Record, TableShape, ID_COLUMN};

/// Every table the pipeline writes, referenced tables first.
pub const SCHEMA: [TableShape; 5] = [
    Station::SHAPE,
    Device::SHAPE,
    Instrument::SHAPE,
    StationInstrument::SHAPE,
    Image::SHAPE,
];
