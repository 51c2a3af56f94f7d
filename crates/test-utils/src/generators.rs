//! Builders for synthetic snapshot buffers.
//!
//! Buffers are produced with the codec's own encoder, so tests can start
//! from known field values and check that they survive the pipeline.

use snapshot_codec::{encode, FormatVersion, PixelMatrix, SnapshotMetadata};

use crate::fixtures::{DEVICE, START_TIME, STATION};

/// Creates a pixel matrix whose samples count up from zero in row-major
/// order.
///
/// # Example
///
/// ```
/// use test_utils::sequential_pixels;
///
/// let pixels = sequential_pixels(2, 4);
/// assert_eq!(pixels.shape(), (2, 4));
/// assert_eq!(pixels.row(1), Some(&[4, 5, 6, 7][..]));
/// ```
pub fn sequential_pixels(height: usize, width: usize) -> PixelMatrix {
    let data = (0..height * width).map(|i| (i % 65_536) as u16).collect();
    PixelMatrix::from_vec(height, width, data).unwrap_or_default()
}

/// Builds a snapshot buffer field by field.
///
/// Defaults describe a version 2 capture from station `lwl`, device `cam1`
/// with a 4×2 sequential image.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    format: FormatVersion,
    metadata: SnapshotMetadata,
    pixels: PixelMatrix,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        let pixels = sequential_pixels(2, 4);
        Self {
            format: FormatVersion::V2,
            metadata: SnapshotMetadata {
                version: FormatVersion::V2.tag(),
                start_time: START_TIME,
                station: STATION.to_string(),
                latitude: 40.75,
                longitude: -110.5,
                serialnum: 31337,
                device_name: DEVICE.to_string(),
                label: "Low Wind Lake".to_string(),
                instrument: String::new(),
                exposure_time: 60.0,
                x: 0,
                y: 0,
                width: 4,
                height: 2,
                bytes_per_pixel: 2,
                bin_x: 2,
                bin_y: 2,
                ccd_temp: -19.75,
                set_point: -20.0,
                image_bytes: 16,
            },
            pixels,
        }
    }
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, format: FormatVersion) -> Self {
        self.format = format;
        self.metadata.version = format.tag();
        self
    }

    pub fn station(mut self, station: &str) -> Self {
        self.metadata.station = station.to_string();
        self
    }

    pub fn device(mut self, device: &str) -> Self {
        self.metadata.device_name = device.to_string();
        self
    }

    /// Only written by version 3 headers.
    pub fn instrument(mut self, instrument: &str) -> Self {
        self.metadata.instrument = instrument.to_string();
        self
    }

    pub fn start_time(mut self, start_time: i32) -> Self {
        self.metadata.start_time = start_time;
        self
    }

    pub fn serialnum(mut self, serialnum: i32) -> Self {
        self.metadata.serialnum = serialnum;
        self
    }

    pub fn ccd_temp(mut self, ccd_temp: f32) -> Self {
        self.metadata.ccd_temp = ccd_temp;
        self
    }

    /// Replace the image, keeping the declared geometry in step.
    pub fn pixels(mut self, pixels: PixelMatrix) -> Self {
        self.metadata.width = pixels.width() as i32;
        self.metadata.height = pixels.height() as i32;
        self.metadata.image_bytes = (pixels.as_slice().len() * 2) as i32;
        self.pixels = pixels;
        self
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    pub fn build(&self) -> Vec<u8> {
        encode(self.format, &self.metadata, &self.pixels)
    }
}
