//! Snapshot header parsing.
//!
//! Every snapshot starts with a one-byte version tag followed by a fixed-size,
//! packed, big-endian header. The layouts grow by appending fixed-length
//! string fields in the middle of the record:
//!
//! ```text
//! v1: tag start_time station lat lon serialnum device_name                  exposure x y w h bpp bin_x bin_y ccd_temp set_point image_bytes
//! v2: tag start_time station lat lon serialnum device_name label            exposure ...
//! v3: tag start_time station lat lon serialnum device_name label instrument exposure ...
//! ```
//!
//! Each version has its own parser; they share the readers for the common
//! leading and trailing runs of fields.

use bytes::{Buf, BufMut};

use crate::error::{DecodeError, Result};
use crate::SnapshotMetadata;

/// Width of every fixed-length string field on the wire.
pub const STRING_FIELD_LEN: usize = 40;

/// tag, start_time, station, latitude, longitude, serialnum, device_name
const PREFIX_LEN: usize = 1 + 4 + STRING_FIELD_LEN + 4 + 4 + 4 + STRING_FIELD_LEN;

/// exposure_time, 7 geometry ints, ccd_temp, set_point, image_bytes
const GEOMETRY_LEN: usize = 4 + 7 * 4 + 4 + 4 + 4;

/// Known snapshot format versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    V1,
    V2,
    V3,
}

impl FormatVersion {
    pub const ALL: [FormatVersion; 3] = [FormatVersion::V1, FormatVersion::V2, FormatVersion::V3];

    /// Map a wire tag onto a known version. Unknown tags are rejected, never guessed.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(FormatVersion::V1),
            2 => Ok(FormatVersion::V2),
            3 => Ok(FormatVersion::V3),
            other => Err(DecodeError::UnsupportedVersion(other)),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            FormatVersion::V1 => 1,
            FormatVersion::V2 => 2,
            FormatVersion::V3 => 3,
        }
    }

    /// Size in bytes of the fixed header, including the tag.
    pub const fn header_size(self) -> usize {
        match self {
            FormatVersion::V1 => PREFIX_LEN + GEOMETRY_LEN,
            FormatVersion::V2 => PREFIX_LEN + STRING_FIELD_LEN + GEOMETRY_LEN,
            FormatVersion::V3 => PREFIX_LEN + 2 * STRING_FIELD_LEN + GEOMETRY_LEN,
        }
    }
}

/// Parse the header at the start of `data`.
///
/// Returns the detected format together with the decoded metadata. The tag is
/// checked before anything else is read, so an unknown version never produces
/// a partial parse.
pub fn parse_header(data: &[u8]) -> Result<(FormatVersion, SnapshotMetadata)> {
    let tag = *data.first().ok_or(DecodeError::TruncatedHeader {
        version: 0,
        expected: 1,
        actual: 0,
    })?;
    let format = FormatVersion::from_tag(tag)?;

    let size = format.header_size();
    if data.len() < size {
        return Err(DecodeError::TruncatedHeader {
            version: tag,
            expected: size,
            actual: data.len(),
        });
    }

    let mut buf = &data[..size];
    let metadata = match format {
        FormatVersion::V1 => parse_version_1(&mut buf),
        FormatVersion::V2 => parse_version_2(&mut buf),
        FormatVersion::V3 => parse_version_3(&mut buf),
    };

    Ok((format, metadata))
}

fn parse_version_1(buf: &mut impl Buf) -> SnapshotMetadata {
    let prefix = read_prefix(buf);
    let geometry = read_geometry(buf);
    assemble(prefix, String::new(), String::new(), geometry)
}

fn parse_version_2(buf: &mut impl Buf) -> SnapshotMetadata {
    let prefix = read_prefix(buf);
    let label = read_fixed_string(buf);
    let geometry = read_geometry(buf);
    assemble(prefix, label, String::new(), geometry)
}

fn parse_version_3(buf: &mut impl Buf) -> SnapshotMetadata {
    let prefix = read_prefix(buf);
    let label = read_fixed_string(buf);
    let instrument = read_fixed_string(buf);
    let geometry = read_geometry(buf);
    assemble(prefix, label, instrument, geometry)
}

/// Leading fields shared by all versions.
struct Prefix {
    version: u8,
    start_time: i32,
    station: String,
    latitude: f32,
    longitude: f32,
    serialnum: i32,
    device_name: String,
}

/// Trailing exposure and sensor geometry fields shared by all versions.
struct Geometry {
    exposure_time: f32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    bytes_per_pixel: i32,
    bin_x: i32,
    bin_y: i32,
    ccd_temp: f32,
    set_point: f32,
    image_bytes: i32,
}

fn read_prefix(buf: &mut impl Buf) -> Prefix {
    Prefix {
        version: buf.get_u8(),
        start_time: buf.get_i32(),
        station: read_fixed_string(buf),
        latitude: buf.get_f32(),
        longitude: buf.get_f32(),
        serialnum: buf.get_i32(),
        device_name: read_fixed_string(buf),
    }
}

fn read_geometry(buf: &mut impl Buf) -> Geometry {
    Geometry {
        exposure_time: buf.get_f32(),
        x: buf.get_i32(),
        y: buf.get_i32(),
        width: buf.get_i32(),
        height: buf.get_i32(),
        bytes_per_pixel: buf.get_i32(),
        bin_x: buf.get_i32(),
        bin_y: buf.get_i32(),
        ccd_temp: buf.get_f32(),
        set_point: buf.get_f32(),
        image_bytes: buf.get_i32(),
    }
}

/// Read a NUL-padded fixed-length string, dropping the trailing padding.
fn read_fixed_string(buf: &mut impl Buf) -> String {
    let mut raw = [0u8; STRING_FIELD_LEN];
    buf.copy_to_slice(&mut raw);
    trim_padding(&raw)
}

/// Strip trailing NUL bytes. Interior NULs are kept, as the camera writes them.
pub fn trim_padding(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn assemble(prefix: Prefix, label: String, instrument: String, geometry: Geometry) -> SnapshotMetadata {
    SnapshotMetadata {
        version: prefix.version,
        start_time: prefix.start_time,
        station: prefix.station,
        latitude: prefix.latitude,
        longitude: prefix.longitude,
        serialnum: prefix.serialnum,
        device_name: prefix.device_name,
        label,
        instrument,
        exposure_time: geometry.exposure_time,
        x: geometry.x,
        y: geometry.y,
        width: geometry.width,
        height: geometry.height,
        bytes_per_pixel: geometry.bytes_per_pixel,
        bin_x: geometry.bin_x,
        bin_y: geometry.bin_y,
        ccd_temp: geometry.ccd_temp,
        set_point: geometry.set_point,
        image_bytes: geometry.image_bytes,
    }
}

// ===== Writing =====

/// Write the header for `format`. The tag written is the format's, not
/// `metadata.version`. Strings longer than the field are truncated.
pub fn write_header(format: FormatVersion, metadata: &SnapshotMetadata, out: &mut impl BufMut) {
    out.put_u8(format.tag());
    out.put_i32(metadata.start_time);
    write_fixed_string(out, &metadata.station);
    out.put_f32(metadata.latitude);
    out.put_f32(metadata.longitude);
    out.put_i32(metadata.serialnum);
    write_fixed_string(out, &metadata.device_name);

    match format {
        FormatVersion::V1 => {}
        FormatVersion::V2 => write_fixed_string(out, &metadata.label),
        FormatVersion::V3 => {
            write_fixed_string(out, &metadata.label);
            write_fixed_string(out, &metadata.instrument);
        }
    }

    out.put_f32(metadata.exposure_time);
    for value in [
        metadata.x,
        metadata.y,
        metadata.width,
        metadata.height,
        metadata.bytes_per_pixel,
        metadata.bin_x,
        metadata.bin_y,
    ] {
        out.put_i32(value);
    }
    out.put_f32(metadata.ccd_temp);
    out.put_f32(metadata.set_point);
    out.put_i32(metadata.image_bytes);
}

fn write_fixed_string(out: &mut impl BufMut, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(STRING_FIELD_LEN);
    out.put_slice(&bytes[..len]);
    out.put_bytes(0, STRING_FIELD_LEN - len);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_sizes() {
        assert_eq!(FormatVersion::V1.header_size(), 141);
        assert_eq!(FormatVersion::V2.header_size(), 181);
        assert_eq!(FormatVersion::V3.header_size(), 221);
    }

    #[test]
    fn test_from_tag_roundtrip() {
        for format in FormatVersion::ALL {
            assert_eq!(FormatVersion::from_tag(format.tag()).unwrap(), format);
        }
    }

    #[test]
    fn test_from_tag_rejects_unknown() {
        assert_eq!(
            FormatVersion::from_tag(0),
            Err(DecodeError::UnsupportedVersion(0))
        );
        assert_eq!(
            FormatVersion::from_tag(4),
            Err(DecodeError::UnsupportedVersion(4))
        );
    }

    #[test]
    fn test_trim_padding() {
        assert_eq!(trim_padding(b"lwl\0\0\0"), "lwl");
        assert_eq!(trim_padding(b"\0\0\0"), "");
        assert_eq!(trim_padding(b"a\0b\0"), "a\0b");
        assert_eq!(trim_padding(b"full"), "full");
    }

    #[test]
    fn test_empty_buffer_is_truncated_header() {
        let err = parse_header(&[]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedHeader {
                version: 0,
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn test_long_string_is_truncated_on_write() {
        let mut out = Vec::new();
        write_fixed_string(&mut out, &"x".repeat(50));
        assert_eq!(out.len(), STRING_FIELD_LEN);
        assert!(out.iter().all(|&b| b == b'x'));
    }
}
