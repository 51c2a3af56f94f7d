//! Natural key → surrogate id resolution for snapshot references.

use tracing::debug;

use snapshot_codec::SnapshotMetadata;
use storage::{Criteria, Device, Instrument, Station, StationInstrument, Store};

use crate::error::{ReferenceNotFound, ResolveError};

/// Names a snapshot uses to refer to reference rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceKeys {
    pub station: String,
    pub device: String,
    pub instrument: String,
}

impl ReferenceKeys {
    /// Keys from decoded metadata. Headers older than v3 carry no
    /// instrument, so the route's data-type tag names it instead.
    pub fn from_metadata(metadata: &SnapshotMetadata, data_type: &str) -> Self {
        let instrument = if metadata.instrument.is_empty() {
            data_type.to_string()
        } else {
            metadata.instrument.clone()
        };
        Self {
            station: metadata.station.clone(),
            device: metadata.device_name.clone(),
            instrument,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedReferences {
    pub station_id: i64,
    pub device_id: i64,
    pub instrument_id: i64,
    pub stationinstrument_id: i64,
}

/// Read-only lookups of reference rows. Never creates anything.
pub struct ReferenceResolver<'a> {
    store: &'a Store,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, keys: &ReferenceKeys) -> Result<ResolvedReferences, ResolveError> {
        let station = self
            .store
            .lookup::<Station>(&Criteria::new().eq("name", keys.station.as_str()))
            .await?
            .ok_or_else(|| ReferenceNotFound::UnknownStation(keys.station.clone()))?;
        let station_id = require_id(station.id, &keys.station)?;

        let instrument = self
            .store
            .lookup::<Instrument>(&Criteria::new().eq("name", keys.instrument.as_str()))
            .await?
            .ok_or_else(|| ReferenceNotFound::UnknownInstrument(keys.instrument.clone()))?;
        let instrument_id = require_id(instrument.id, &keys.instrument)?;

        let pairing = self
            .store
            .lookup::<StationInstrument>(
                &Criteria::new()
                    .eq("station_id", station_id)
                    .eq("instrument_id", instrument_id),
            )
            .await?
            .ok_or_else(|| ReferenceNotFound::UnknownStationInstrument {
                station: keys.station.clone(),
                instrument: keys.instrument.clone(),
            })?;
        let stationinstrument_id = require_id(pairing.id, &keys.instrument)?;

        let device = self
            .store
            .lookup::<Device>(&Criteria::new().eq("name", keys.device.as_str()))
            .await?
            .ok_or_else(|| ReferenceNotFound::UnknownDevice(keys.device.clone()))?;
        let device_id = require_id(device.id, &keys.device)?;

        debug!(
            station_id,
            instrument_id,
            stationinstrument_id,
            device_id,
            "Resolved references"
        );

        Ok(ResolvedReferences {
            station_id,
            device_id,
            instrument_id,
            stationinstrument_id,
        })
    }
}

// Rows read back from the store always carry an id
fn require_id(id: Option<i64>, name: &str) -> Result<i64, ResolveError> {
    id.ok_or_else(|| {
        ResolveError::Store(storage::StoreError::Database(format!(
            "reference '{}' has no id",
            name
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_falls_back_to_data_type() {
        let mut metadata = SnapshotMetadata {
            station: "lwl".into(),
            device_name: "cam1".into(),
            ..Default::default()
        };
        let keys = ReferenceKeys::from_metadata(&metadata, "greenline");
        assert_eq!(keys.instrument, "greenline");

        metadata.instrument = "redline".into();
        let keys = ReferenceKeys::from_metadata(&metadata, "greenline");
        assert_eq!(keys.instrument, "redline");
        assert_eq!(keys.station, "lwl");
        assert_eq!(keys.device, "cam1");
    }

    async fn seeded() -> Store {
        let (store, _) = Store::memory();
        let station = store
            .lookup_or_create(&Station::new("lwl"), &["name"])
            .await
            .unwrap();
        let instrument = store
            .lookup_or_create(&Instrument::new("greenline"), &["name"])
            .await
            .unwrap();
        store
            .lookup_or_create(&Device::new("cam1"), &["name"])
            .await
            .unwrap();
        store
            .lookup_or_create(
                &StationInstrument::new(station.id.unwrap(), instrument.id.unwrap()),
                &["station_id", "instrument_id"],
            )
            .await
            .unwrap();
        store
    }

    fn keys(station: &str, device: &str, instrument: &str) -> ReferenceKeys {
        ReferenceKeys {
            station: station.into(),
            device: device.into(),
            instrument: instrument.into(),
        }
    }

    #[tokio::test]
    async fn test_resolve_known_references() {
        let store = seeded().await;
        let resolved = ReferenceResolver::new(&store)
            .resolve(&keys("lwl", "cam1", "greenline"))
            .await
            .unwrap();
        assert_eq!(
            resolved,
            ResolvedReferences {
                station_id: 1,
                device_id: 1,
                instrument_id: 1,
                stationinstrument_id: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_reports_first_missing_reference() {
        let store = seeded().await;
        let resolver = ReferenceResolver::new(&store);

        let cases = [
            (keys("xyz", "cam9", "blue"), ReferenceNotFound::UnknownStation("xyz".into())),
            (keys("lwl", "cam9", "blue"), ReferenceNotFound::UnknownInstrument("blue".into())),
            (keys("lwl", "cam9", "greenline"), ReferenceNotFound::UnknownDevice("cam9".into())),
        ];
        for (keys, expected) in cases {
            assert_eq!(
                resolver.resolve(&keys).await,
                Err(ResolveError::NotFound(expected))
            );
        }
    }

    #[tokio::test]
    async fn test_resolve_unpaired_instrument() {
        let store = seeded().await;
        store
            .lookup_or_create(&Instrument::new("redline"), &["name"])
            .await
            .unwrap();

        let err = ReferenceResolver::new(&store)
            .resolve(&keys("lwl", "cam1", "redline"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::NotFound(ReferenceNotFound::UnknownStationInstrument {
                station: "lwl".into(),
                instrument: "redline".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_resolver_never_creates_rows() {
        let store = seeded().await;
        let _ = ReferenceResolver::new(&store)
            .resolve(&keys("new", "new", "new"))
            .await;
        assert_eq!(store.count::<Station>().await.unwrap(), 1);
        assert_eq!(store.count::<Device>().await.unwrap(), 1);
    }
}
