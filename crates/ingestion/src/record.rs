//! Mapping of decoded snapshots onto image rows.

use chrono::{DateTime, TimeZone, Utc};

use snapshot_codec::SnapshotMetadata;
use storage::Image;

use crate::resolver::ResolvedReferences;

/// Capture time of a snapshot. `start_time` is Unix seconds in UTC.
pub fn capture_time(metadata: &SnapshotMetadata) -> DateTime<Utc> {
    // Every i32 second count is in chrono's range
    Utc.timestamp_opt(metadata.start_time.into(), 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Image row for `metadata` with resolved reference ids.
pub fn image_from_snapshot(metadata: &SnapshotMetadata, refs: &ResolvedReferences) -> Image {
    Image {
        id: None,
        timestamp: capture_time(metadata),
        device_id: refs.device_id,
        serialnum: metadata.serialnum.into(),
        latitude: metadata.latitude.into(),
        longitude: metadata.longitude.into(),
        exposure_time: metadata.exposure_time.into(),
        ccd_temp: metadata.ccd_temp.into(),
        set_point: metadata.set_point.into(),
        image_bytes: metadata.image_bytes.into(),
        x: metadata.x.into(),
        y: metadata.y.into(),
        width: metadata.width.into(),
        height: metadata.height.into(),
        bin_x: metadata.bin_x.into(),
        bin_y: metadata.bin_y.into(),
        stationinstrument_id: refs.stationinstrument_id,
    }
}
