//! Entities persisted by the ingest pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::StoreResult;
use crate::value::{Column, ColumnKind, Record, TableShape, ID_COLUMN};

/// Match key for image rows.
pub const IMAGE_KEY: &[&str] = &["timestamp", "stationinstrument_id"];

const NAMED_COLUMNS: &[Column] = &[
    Column::new("name", ColumnKind::Text),
    Column::new("label", ColumnKind::Text),
];

macro_rules! named_entity {
    ($(#[$meta:meta])* $name:ident, $table:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(default)]
            pub id: Option<i64>,
            pub name: String,
            #[serde(default)]
            pub label: Option<String>,
        }

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self {
                    id: None,
                    name: name.into(),
                    label: None,
                }
            }

            pub fn with_label(mut self, label: impl Into<String>) -> Self {
                self.label = Some(label.into());
                self
            }
        }

        impl Entity for $name {
            const SHAPE: TableShape = TableShape {
                table: $table,
                columns: NAMED_COLUMNS,
                primary_key: &[ID_COLUMN],
                unique: &[&["name"]],
                foreign_keys: &[],
            };

            fn id(&self) -> Option<i64> {
                self.id
            }

            fn to_values(&self) -> Record {
                let mut record = Record::new()
                    .with("name", self.name.as_str())
                    .with("label", self.label.clone());
                if let Some(id) = self.id {
                    record.set(ID_COLUMN, id);
                }
                record
            }

            fn from_values(record: &Record) -> StoreResult<Self> {
                Ok(Self {
                    id: record.opt_int(ID_COLUMN)?,
                    name: record.text("name")?,
                    label: record.opt_text("label")?,
                })
            }
        }
    };
}

named_entity!(
    /// An observing site.
    Station,
    "station"
);
named_entity!(
    /// A camera body, identified by its reported device name.
    Device,
    "device"
);
named_entity!(
    /// An optical channel such as `greenline` or `redline`.
    Instrument,
    "instrument"
);

/// Pairing of an instrument with the station it is deployed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInstrument {
    #[serde(default)]
    pub id: Option<i64>,
    pub station_id: i64,
    pub instrument_id: i64,
}

impl StationInstrument {
    pub fn new(station_id: i64, instrument_id: i64) -> Self {
        Self {
            id: None,
            station_id,
            instrument_id,
        }
    }
}

impl Entity for StationInstrument {
    const SHAPE: TableShape = TableShape {
        table: "stationinstrument",
        columns: &[
            Column::new("station_id", ColumnKind::Integer),
            Column::new("instrument_id", ColumnKind::Integer),
        ],
        primary_key: &[ID_COLUMN],
        unique: &[&["station_id", "instrument_id"]],
        foreign_keys: &[("station_id", "station"), ("instrument_id", "instrument")],
    };

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn to_values(&self) -> Record {
        let mut record = Record::new()
            .with("station_id", self.station_id)
            .with("instrument_id", self.instrument_id);
        if let Some(id) = self.id {
            record.set(ID_COLUMN, id);
        }
        record
    }

    fn from_values(record: &Record) -> StoreResult<Self> {
        Ok(Self {
            id: record.opt_int(ID_COLUMN)?,
            station_id: record.int("station_id")?,
            instrument_id: record.int("instrument_id")?,
        })
    }
}

/// Canonical metadata row for one captured exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub device_id: i64,
    pub serialnum: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub exposure_time: f64,
    pub ccd_temp: f64,
    pub set_point: f64,
    pub image_bytes: i64,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub bin_x: i64,
    pub bin_y: i64,
    pub stationinstrument_id: i64,
}

impl Entity for Image {
    const SHAPE: TableShape = TableShape {
        table: "image",
        columns: &[
            Column::new("timestamp", ColumnKind::Timestamp),
            Column::new("device_id", ColumnKind::Integer),
            Column::new("serialnum", ColumnKind::Integer),
            Column::new("latitude", ColumnKind::Float),
            Column::new("longitude", ColumnKind::Float),
            Column::new("exposure_time", ColumnKind::Float),
            Column::new("ccd_temp", ColumnKind::Float),
            Column::new("set_point", ColumnKind::Float),
            Column::new("image_bytes", ColumnKind::Integer),
            Column::new("x", ColumnKind::Integer),
            Column::new("y", ColumnKind::Integer),
            Column::new("width", ColumnKind::Integer),
            Column::new("height", ColumnKind::Integer),
            Column::new("bin_x", ColumnKind::Integer),
            Column::new("bin_y", ColumnKind::Integer),
            Column::new("stationinstrument_id", ColumnKind::Integer),
        ],
        primary_key: IMAGE_KEY,
        unique: &[IMAGE_KEY],
        foreign_keys: &[
            ("device_id", "device"),
            ("stationinstrument_id", "stationinstrument"),
        ],
    };

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn to_values(&self) -> Record {
        let mut record = Record::new()
            .with("timestamp", self.timestamp)
            .with("device_id", self.device_id)
            .with("serialnum", self.serialnum)
            .with("latitude", self.latitude)
            .with("longitude", self.longitude)
            .with("exposure_time", self.exposure_time)
            .with("ccd_temp", self.ccd_temp)
            .with("set_point", self.set_point)
            .with("image_bytes", self.image_bytes)
            .with("x", self.x)
            .with("y", self.y)
            .with("width", self.width)
            .with("height", self.height)
            .with("bin_x", self.bin_x)
            .with("bin_y", self.bin_y)
            .with("stationinstrument_id", self.stationinstrument_id);
        if let Some(id) = self.id {
            record.set(ID_COLUMN, id);
        }
        record
    }

    fn from_values(record: &Record) -> StoreResult<Self> {
        Ok(Self {
            id: record.opt_int(ID_COLUMN)?,
            timestamp: record.timestamp("timestamp")?,
            device_id: record.int("device_id")?,
            serialnum: record.int("serialnum")?,
            latitude: record.float("latitude")?,
            longitude: record.float("longitude")?,
            exposure_time: record.float("exposure_time")?,
            ccd_temp: record.float("ccd_temp")?,
            set_point: record.float("set_point")?,
            image_bytes: record.int("image_bytes")?,
            x: record.int("x")?,
            y: record.int("y")?,
            width: record.int("width")?,
            height: record.int("height")?,
            bin_x: record.int("bin_x")?,
            bin_y: record.int("bin_y")?,
            stationinstrument_id: record.int("stationinstrument_id")?,
        })
    }
}
