//! Typed facade over a [`StoreBackend`].

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::backend::{StoreBackend, UpsertOutcome};
use crate::entity::Entity;
use crate::error::StoreResult;
use crate::memory::MemoryBackend;
use crate::postgres::{DatabaseConfig, PgBackend};
use crate::value::Criteria;

/// Idempotent match-or-create persistence for [`Entity`] types.
///
/// Holds no session between calls: every write acquires and finishes its
/// own transaction in the backend.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn StoreBackend>,
}

impl Store {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Store over a fresh in-memory backend.
    pub fn memory() -> (Self, MemoryBackend) {
        let backend = MemoryBackend::new();
        (Self::new(Arc::new(backend.clone())), backend)
    }

    /// Store over a PostgreSQL pool.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let backend = PgBackend::connect(config).await?;
        info!(max_connections = config.max_connections, "Connected to database");
        Ok(Self::new(Arc::new(backend)))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Insert `entity`, or overwrite the row whose `match_keys` columns hold
    /// the same values. Without match keys the entity's primary key is used.
    pub async fn try_upsert<E: Entity>(
        &self,
        entity: &E,
        match_keys: Option<&[&str]>,
    ) -> StoreResult<UpsertOutcome> {
        let shape = E::SHAPE;
        let keys = shape.resolve_all(match_keys.unwrap_or(shape.primary_key))?;
        let record = entity.to_values();
        shape.check_record(&record)?;

        let outcome = self.backend.upsert(&shape, &record, &keys).await?;
        info!(
            table = shape.table,
            id = outcome.id(),
            "{} {} record",
            outcome.verb(),
            shape.table
        );
        Ok(outcome)
    }

    /// Like [`Store::try_upsert`], logging the failure and reporting it as
    /// `false`.
    pub async fn upsert<E: Entity>(&self, entity: &E, match_keys: Option<&[&str]>) -> bool {
        match self.try_upsert(entity, match_keys).await {
            Ok(_) => true,
            Err(e) => {
                error!(table = E::SHAPE.table, error = %e, "Upsert failed");
                false
            }
        }
    }

    /// First row matching `criteria`, if any.
    pub async fn lookup<E: Entity>(&self, criteria: &Criteria) -> StoreResult<Option<E>> {
        let shape = E::SHAPE;
        let filter = criteria.resolve(&shape)?;
        let rows = self.backend.find(&shape, &filter).await?;
        if rows.len() > 1 {
            debug!(table = shape.table, matches = rows.len(), "Lookup matched several rows");
        }
        rows.first().map(E::from_values).transpose()
    }

    /// The row matching `entity` on `match_keys`, inserted first if missing.
    pub async fn lookup_or_create<E: Entity>(&self, entity: &E, match_keys: &[&str]) -> StoreResult<E> {
        let shape = E::SHAPE;
        let keys = shape.resolve_all(match_keys)?;
        let record = entity.to_values();
        shape.check_record(&record)?;

        let (row, created) = self.backend.insert_if_absent(&shape, &record, &keys).await?;
        if created {
            info!(table = shape.table, id = ?row.id(), "Added {} record", shape.table);
        }
        E::from_values(&row)
    }

    pub async fn count<E: Entity>(&self) -> StoreResult<u64> {
        self.backend.count(&E::SHAPE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{Device, Image, Instrument, Station, StationInstrument, IMAGE_KEY};
    use chrono::{TimeZone, Utc};

    fn image(serialnum: i64, stationinstrument_id: i64) -> Image {
        Image {
            id: None,
            timestamp: Utc.timestamp_opt(1_628_829_840, 0).unwrap(),
            device_id: 1,
            serialnum,
            latitude: 40.0,
            longitude: -110.0,
            exposure_time: 60.0,
            ccd_temp: -20.0,
            set_point: -20.0,
            image_bytes: 16,
            x: 0,
            y: 0,
            width: 4,
            height: 2,
            bin_x: 1,
            bin_y: 1,
            stationinstrument_id,
        }
    }

    #[tokio::test]
    async fn test_identical_upsert_is_idempotent() {
        let (store, _) = Store::memory();
        let first = store.try_upsert(&image(7, 1), Some(IMAGE_KEY)).await.unwrap();
        let second = store.try_upsert(&image(7, 1), Some(IMAGE_KEY)).await.unwrap();

        assert_eq!(first, UpsertOutcome::Inserted(1));
        assert_eq!(second, UpsertOutcome::Updated(1));
        assert_eq!(store.count::<Image>().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_fields_in_place() {
        let (store, _) = Store::memory();
        assert!(store.upsert(&image(7, 1), Some(IMAGE_KEY)).await);
        assert!(store.upsert(&image(99, 1), Some(IMAGE_KEY)).await);

        assert_eq!(store.count::<Image>().await.unwrap(), 1);
        let stored: Image = store
            .lookup(&Criteria::new().eq("stationinstrument_id", 1i64))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.serialnum, 99);
        assert_eq!(stored.id, Some(1));

        // A different key is a different row
        assert!(store.upsert(&image(7, 2), Some(IMAGE_KEY)).await);
        assert_eq!(store.count::<Image>().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back() {
        let (store, backend) = Store::memory();
        store.try_upsert(&image(7, 1), Some(IMAGE_KEY)).await.unwrap();

        backend.fail_next_commit();
        assert!(!store.upsert(&image(8, 1), Some(IMAGE_KEY)).await);

        let stored: Image = store
            .lookup(&Criteria::new().eq("serialnum", 7i64))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.serialnum, 7);
    }

    #[tokio::test]
    async fn test_unknown_match_key_rejected() {
        let (store, _) = Store::memory();
        let err = store
            .try_upsert(&Station::new("lwl"), Some(&["callsign"][..]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::UnknownColumn {
                table: "station",
                column: "callsign".to_string()
            }
        );
        assert_eq!(store.count::<Station>().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_null_match_key_rejected() {
        let (store, _) = Store::memory();
        let err = store
            .try_upsert(&Device::new("cam1"), Some(&["label"][..]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingMatchKey { column: "label", .. }));
    }

    #[tokio::test]
    async fn test_primary_key_match_requires_id() {
        let (store, _) = Store::memory();
        // Primary key "id" is absent on a new entity
        let err = store.try_upsert(&Station::new("lwl"), None).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingMatchKey { column: "id", .. }));

        let created = store
            .lookup_or_create(&Station::new("lwl"), &["name"])
            .await
            .unwrap();
        let renamed = created.clone().with_label("Low Wind Lake");
        let outcome = store.try_upsert(&renamed, None).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated(1));
    }

    #[tokio::test]
    async fn test_lookup_or_create_returns_existing() {
        let (store, _) = Store::memory();
        let first = store
            .lookup_or_create(&Instrument::new("greenline"), &["name"])
            .await
            .unwrap();
        let again = store
            .lookup_or_create(&Instrument::new("greenline").with_label("ignored"), &["name"])
            .await
            .unwrap();

        assert_eq!(first.id, Some(1));
        assert_eq!(again, first);
        assert_eq!(store.count::<Instrument>().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookup_missing_row() {
        let (store, _) = Store::memory();
        let found: Option<StationInstrument> = store
            .lookup(&Criteria::new().eq("station_id", 1i64).eq("instrument_id", 2i64))
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
