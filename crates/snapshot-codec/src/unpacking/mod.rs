//! Pixel payload unpacking.
//!
//! The payload directly follows the header: `width * height` unsigned 16-bit
//! big-endian samples, row-major. Trailing bytes past the pixel region are
//! ignored.

use bytes::BufMut;

use crate::error::{DecodeError, Result};

/// A row-major matrix of 16-bit sensor samples with shape `(height, width)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelMatrix {
    width: usize,
    height: usize,
    data: Vec<u16>,
}

impl PixelMatrix {
    /// Build a matrix from row-major samples. Returns `None` when the sample
    /// count does not match the shape.
    pub fn from_vec(height: usize, width: usize, data: Vec<u16>) -> Option<Self> {
        (height.checked_mul(width)? == data.len()).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u16> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[u16]> {
        if row >= self.height {
            return None;
        }
        let start = row * self.width;
        self.data.get(start..start + self.width)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u16]> {
        // chunks_exact panics on 0
        self.data.chunks_exact(self.width.max(1))
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u16> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Number of payload bytes a `width x height` image occupies.
pub fn payload_len(width: i32, height: i32) -> Result<usize> {
    let invalid = DecodeError::InvalidDimensions { width, height };
    let w = usize::try_from(width).map_err(|_| invalid.clone())?;
    let h = usize::try_from(height).map_err(|_| invalid.clone())?;

    w.checked_mul(h)
        .and_then(|count| count.checked_mul(2))
        .ok_or(invalid)
}

/// Unpack the pixel region at the start of `payload`.
pub fn unpack_pixels(payload: &[u8], width: i32, height: i32) -> Result<PixelMatrix> {
    let expected = payload_len(width, height)?;
    if payload.len() < expected {
        return Err(DecodeError::TruncatedPayload {
            expected,
            actual: payload.len(),
        });
    }

    let data = payload[..expected]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    // payload_len already proved both dimensions are non-negative
    Ok(PixelMatrix {
        width: width as usize,
        height: height as usize,
        data,
    })
}

/// Write samples in wire order.
pub fn pack_pixels(pixels: &PixelMatrix, out: &mut impl BufMut) {
    for &sample in pixels.as_slice() {
        out.put_u16(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_row_major() {
        let payload: Vec<u8> = (0u16..6).flat_map(|v| v.to_be_bytes()).collect();
        let pixels = unpack_pixels(&payload, 3, 2).unwrap();

        assert_eq!(pixels.shape(), (2, 3));
        assert_eq!(pixels.row(0), Some(&[0, 1, 2][..]));
        assert_eq!(pixels.row(1), Some(&[3, 4, 5][..]));
        assert_eq!(pixels.get(1, 2), Some(5));
        assert_eq!(pixels.get(2, 0), None);
    }

    #[test]
    fn test_unpack_big_endian() {
        let pixels = unpack_pixels(&[0x12, 0x34, 0xFF, 0xFE], 2, 1).unwrap();
        assert_eq!(pixels.as_slice(), &[0x1234, 0xFFFE]);
    }

    #[test]
    fn test_unpack_ignores_trailing_bytes() {
        let pixels = unpack_pixels(&[0, 1, 0, 2, 9, 9, 9], 2, 1).unwrap();
        assert_eq!(pixels.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_unpack_short_payload() {
        let err = unpack_pixels(&[0, 1, 0], 2, 1).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedPayload {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_unpack_negative_dimensions() {
        let err = unpack_pixels(&[], -1, 4).unwrap_err();
        assert_eq!(err, DecodeError::InvalidDimensions { width: -1, height: 4 });
    }

    #[test]
    fn test_zero_sized_image() {
        let pixels = unpack_pixels(&[], 0, 0).unwrap();
        assert!(pixels.is_empty());
        assert_eq!(pixels.rows().count(), 0);
    }

    #[test]
    fn test_from_vec_checks_shape() {
        assert!(PixelMatrix::from_vec(2, 2, vec![1, 2, 3, 4]).is_some());
        assert!(PixelMatrix::from_vec(2, 2, vec![1, 2, 3]).is_none());
    }
}
