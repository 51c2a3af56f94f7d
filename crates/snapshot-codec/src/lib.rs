//! Camera snapshot codec.
//!
//! Remote camera stations ship each exposure as a compact binary record: a
//! versioned fixed-size header carrying station, device and sensor metadata,
//! followed by the raw 16-bit sensor readout. This crate turns those bytes
//! into a [`Snapshot`] and can write them back out.
//!
//! Three header versions are understood (see [`header::FormatVersion`]).
//! Fields a version does not carry (`label` before v2, `instrument` before
//! v3) come back as empty strings so consumers see one stable schema.

pub mod error;
pub mod header;
pub mod tables;
pub mod unpacking;

use std::fmt;

use bytes::BytesMut;
use tracing::debug;

pub use error::{DecodeError, Result};
pub use header::FormatVersion;
pub use tables::units;
pub use unpacking::PixelMatrix;

/// One decoded camera capture.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub pixels: PixelMatrix,
}

/// Header fields of a snapshot, in wire order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnapshotMetadata {
    pub version: u8,
    /// Unix seconds (UTC)
    pub start_time: i32,
    pub station: String,
    pub latitude: f32,
    pub longitude: f32,
    pub serialnum: i32,
    pub device_name: String,
    /// Empty for version 1
    pub label: String,
    /// Empty for versions 1 and 2
    pub instrument: String,
    pub exposure_time: f32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub bytes_per_pixel: i32,
    pub bin_x: i32,
    pub bin_y: i32,
    pub ccd_temp: f32,
    pub set_point: f32,
    pub image_bytes: i32,
}

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Int(i64),
    Float(f32),
    Text(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Int(v) => write!(f, "{}", v),
            MetadataValue::Float(v) => write!(f, "{}", v),
            MetadataValue::Text(v) => f.write_str(v),
        }
    }
}

impl SnapshotMetadata {
    /// All fields as `(name, value)` pairs in wire order.
    pub fn fields(&self) -> Vec<(&'static str, MetadataValue)> {
        use MetadataValue::{Float, Int, Text};

        vec![
            ("version", Int(self.version.into())),
            ("start_time", Int(self.start_time.into())),
            ("station", Text(self.station.clone())),
            ("latitude", Float(self.latitude)),
            ("longitude", Float(self.longitude)),
            ("serialnum", Int(self.serialnum.into())),
            ("device_name", Text(self.device_name.clone())),
            ("label", Text(self.label.clone())),
            ("instrument", Text(self.instrument.clone())),
            ("exposure_time", Float(self.exposure_time)),
            ("x", Int(self.x.into())),
            ("y", Int(self.y.into())),
            ("width", Int(self.width.into())),
            ("height", Int(self.height.into())),
            ("bytes_per_pixel", Int(self.bytes_per_pixel.into())),
            ("bin_x", Int(self.bin_x.into())),
            ("bin_y", Int(self.bin_y.into())),
            ("ccd_temp", Float(self.ccd_temp)),
            ("set_point", Float(self.set_point)),
            ("image_bytes", Int(self.image_bytes.into())),
        ]
    }

    /// Look up a single field by name.
    pub fn get(&self, name: &str) -> Option<MetadataValue> {
        self.fields()
            .into_iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }
}

/// Decode a snapshot buffer.
pub fn decode(data: &[u8]) -> Result<Snapshot> {
    let (format, metadata) = header::parse_header(data)?;
    let payload = &data[format.header_size()..];
    let pixels = unpacking::unpack_pixels(payload, metadata.width, metadata.height)?;

    debug!(
        version = format.tag(),
        station = %metadata.station,
        width = metadata.width,
        height = metadata.height,
        "Decoded snapshot"
    );

    Ok(Snapshot { metadata, pixels })
}

/// Encode a snapshot in the given format.
pub fn encode(format: FormatVersion, metadata: &SnapshotMetadata, pixels: &PixelMatrix) -> Vec<u8> {
    let mut out = BytesMut::with_capacity(format.header_size() + pixels.as_slice().len() * 2);
    header::write_header(format, metadata, &mut out);
    unpacking::pack_pixels(pixels, &mut out);
    out.to_vec()
}

impl Snapshot {
    /// Encode using the format named by `metadata.version`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let format = FormatVersion::from_tag(self.metadata.version)?;
        Ok(encode(format, &self.metadata, &self.pixels))
    }
}
