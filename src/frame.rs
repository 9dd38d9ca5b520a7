//! Frame buffers and the fixed sensor-axis rotation.
//!
//! The sensor reads out with the spectral axis vertical; downstream
//! consumers expect wavelength along the first axis and line pixels along
//! the second. Every captured frame is therefore rotated 90 degrees
//! clockwise before it is written into the output buffer.

use ndarray::{Array2, Array3};

/// Caller-owned capture result, shaped `(cols, rows, frame_count)`.
///
/// `cols` and `rows` are the effective frame dimensions reported by the
/// device after crop alignment, i.e. the first two axes are the rotated
/// frame axes (wavelength, line pixels) and the third indexes frames in
/// acquisition order.
pub type FrameBuffer = Array3<u16>;

/// Rotate a raw sensor frame 90 degrees clockwise.
///
/// A `(rows, cols)` input becomes a `(cols, rows)` output with
/// `out[(x, y)] = in[(rows - 1 - y, x)]`.
pub(crate) fn rotate_cw(raw: &Array2<u16>) -> Array2<u16> {
    let (rows, cols) = raw.dim();
    Array2::from_shape_fn((cols, rows), |(x, y)| raw[(rows - 1 - y, x)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rotate_cw_2x3() {
        let raw = array![[1u16, 2, 3], [4, 5, 6]];
        let rotated = rotate_cw(&raw);
        // Bottom row of the raw frame becomes the left column.
        assert_eq!(rotated, array![[4u16, 1], [5, 2], [6, 3]]);
    }

    #[test]
    fn test_rotate_cw_shape() {
        let raw = Array2::<u16>::zeros((544, 896));
        assert_eq!(rotate_cw(&raw).dim(), (896, 544));
    }

    #[test]
    fn test_four_rotations_identity() {
        let raw = array![[1u16, 2, 3], [4, 5, 6], [7, 8, 9]];
        let back = rotate_cw(&rotate_cw(&rotate_cw(&rotate_cw(&raw))));
        assert_eq!(back, raw);
    }
}
