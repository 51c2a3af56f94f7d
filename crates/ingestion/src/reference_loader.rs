//! Loading of station, device and instrument tables from YAML.
//!
//! ```yaml
//! - kind: station
//!   name: lwl
//!   label: Low Wind Lake
//! - kind: instrument
//!   name: greenline
//! - kind: device
//!   name: cam1
//! - kind: station_instrument
//!   station: lwl
//!   instrument: greenline
//! ```
//!
//! Named entries are upserted by `name`, so re-running a file updates labels
//! without duplicating rows. Pairings name rows that must already exist,
//! either in the store or earlier in the same file.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use storage::{Criteria, Device, Entity, Instrument, Station, StationInstrument, Store};

use crate::error::{IngestionError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceEntry {
    Station {
        name: String,
        #[serde(default)]
        label: Option<String>,
    },
    Device {
        name: String,
        #[serde(default)]
        label: Option<String>,
    },
    Instrument {
        name: String,
        #[serde(default)]
        label: Option<String>,
    },
    StationInstrument {
        station: String,
        instrument: String,
    },
}

impl fmt::Display for ReferenceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceEntry::Station { name, .. } => write!(f, "station '{}'", name),
            ReferenceEntry::Device { name, .. } => write!(f, "device '{}'", name),
            ReferenceEntry::Instrument { name, .. } => write!(f, "instrument '{}'", name),
            ReferenceEntry::StationInstrument {
                station,
                instrument,
            } => write!(f, "station_instrument '{}/{}'", station, instrument),
        }
    }
}

/// Parse a reference document.
pub fn parse_references(yaml: &str) -> Result<Vec<ReferenceEntry>> {
    serde_yaml::from_str(yaml)
        .map_err(|e| IngestionError::InvalidConfig(format!("reference file: {}", e)))
}

pub async fn load_reference_file(store: &Store, path: &Path) -> Result<usize> {
    let yaml = tokio::fs::read_to_string(path).await?;
    let entries = parse_references(&yaml)?;
    load_references(store, &entries).await
}

/// Upsert every entry in order. Stops at the first failing entry.
pub async fn load_references(store: &Store, entries: &[ReferenceEntry]) -> Result<usize> {
    for entry in entries {
        apply(store, entry)
            .await
            .map_err(|reason| IngestionError::ReferenceEntry {
                entry: entry.to_string(),
                reason,
            })?;
    }
    info!(entries = entries.len(), "Loaded reference tables");
    Ok(entries.len())
}

async fn apply(store: &Store, entry: &ReferenceEntry) -> std::result::Result<(), String> {
    match entry {
        ReferenceEntry::Station { name, label } => {
            upsert_named(store, Station::new(name.as_str()), label).await
        }
        ReferenceEntry::Device { name, label } => {
            upsert_named(store, Device::new(name.as_str()), label).await
        }
        ReferenceEntry::Instrument { name, label } => {
            upsert_named(store, Instrument::new(name.as_str()), label).await
        }
        ReferenceEntry::StationInstrument {
            station,
            instrument,
        } => {
            let station_id = named_id::<Station>(store, station).await?;
            let instrument_id = named_id::<Instrument>(store, instrument).await?;
            store
                .lookup_or_create(
                    &StationInstrument::new(station_id, instrument_id),
                    &["station_id", "instrument_id"],
                )
                .await
                .map_err(|e| e.to_string())?;
            Ok(())
        }
    }
}

trait Named: Entity {
    fn set_label(&mut self, label: Option<String>);
}

macro_rules! impl_named {
    ($($ty:ty),*) => {$(
        impl Named for $ty {
            fn set_label(&mut self, label: Option<String>) {
                self.label = label;
            }
        }
    )*};
}

impl_named!(Station, Device, Instrument);

async fn upsert_named<E: Named>(
    store: &Store,
    mut entity: E,
    label: &Option<String>,
) -> std::result::Result<(), String> {
    entity.set_label(label.clone());
    store
        .try_upsert(&entity, Some(&["name"][..]))
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

async fn named_id<E: Named>(store: &Store, name: &str) -> std::result::Result<i64, String> {
    store
        .lookup::<E>(&Criteria::new().eq("name", name))
        .await
        .map_err(|e| e.to_string())?
        .and_then(|row| E::id(&row))
        .ok_or_else(|| format!("no {} named '{}'", E::SHAPE.table, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
- kind: station
  name: lwl
  label: Low Wind Lake
- kind: instrument
  name: greenline
- kind: device
  name: cam1
- kind: station_instrument
  station: lwl
  instrument: greenline
"#;

    #[test]
    fn test_parse_references() {
        let entries = parse_references(DOCUMENT).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries[0],
            ReferenceEntry::Station {
                name: "lwl".into(),
                label: Some("Low Wind Lake".into())
            }
        );
        assert_eq!(entries[3].to_string(), "station_instrument 'lwl/greenline'");
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let err = parse_references("- kind: telescope\n  name: x\n").unwrap_err();
        assert!(matches!(err, IngestionError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let (store, _) = Store::memory();
        let entries = parse_references(DOCUMENT).unwrap();

        load_references(&store, &entries).await.unwrap();
        load_references(&store, &entries).await.unwrap();

        assert_eq!(store.count::<Station>().await.unwrap(), 1);
        assert_eq!(store.count::<Instrument>().await.unwrap(), 1);
        assert_eq!(store.count::<Device>().await.unwrap(), 1);
        assert_eq!(store.count::<StationInstrument>().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_load_updates_label() {
        let (store, _) = Store::memory();
        load_references(&store, &parse_references(DOCUMENT).unwrap())
            .await
            .unwrap();

        let relabel = parse_references("- kind: station\n  name: lwl\n  label: Lake\n").unwrap();
        load_references(&store, &relabel).await.unwrap();

        let station: Station = store
            .lookup(&Criteria::new().eq("name", "lwl"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(station.label.as_deref(), Some("Lake"));
        assert_eq!(station.id, Some(1));
    }

    #[tokio::test]
    async fn test_pairing_with_unknown_station_names_entry() {
        let (store, _) = Store::memory();
        let entries = parse_references(
            "- kind: instrument\n  name: greenline\n\
             - kind: station_instrument\n  station: nowhere\n  instrument: greenline\n",
        )
        .unwrap();

        let err = load_references(&store, &entries).await.unwrap_err();
        match err {
            IngestionError::ReferenceEntry { entry, reason } => {
                assert_eq!(entry, "station_instrument 'nowhere/greenline'");
                assert!(reason.contains("no station named 'nowhere'"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
