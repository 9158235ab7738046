//! Built-in ArUco renderer for the original ArUco dictionary
//!
//! The original dictionary (OpenCV `DICT_ARUCO_ORIGINAL`, number 16) is not a
//! lookup table: each of the five marker rows encodes two ID bits as one of
//! four fixed 5-bit words. A marker is 7x7 cells, a one-cell black frame
//! around 5x5 data cells, white for a set bit.

use image::{Rgb, RgbImage};

use super::RendererError;
use crate::ids::MarkerId;

/// OpenCV dictionary number of the original ArUco dictionary
pub const ARUCO_ORIGINAL_DICTIONARY: u32 = 16;
/// Largest ID in the original dictionary (ten ID bits)
pub const ARUCO_ORIGINAL_MAX_ID: u16 = 1023;
/// Cells per side, frame included
pub const ARUCO_CELLS: u32 = 7;

/// Row words indexed by two ID bits, most significant bit leftmost
const ROW_WORDS: [u8; 4] = [0x10, 0x17, 0x09, 0x0e];

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// The 5x5 data bits of `id`, row by row
pub fn codeword(id: MarkerId) -> Result<[[bool; 5]; 5], RendererError> {
    if id.value() > ARUCO_ORIGINAL_MAX_ID {
        return Err(RendererError::UnsupportedId {
            id,
            max: ARUCO_ORIGINAL_MAX_ID,
        });
    }

    let mut bits = [[false; 5]; 5];
    for (y, row) in bits.iter_mut().enumerate() {
        let word = ROW_WORDS[usize::from(id.value() >> (2 * (4 - y)) & 0x3)];
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = word >> (4 - x) & 1 == 1;
        }
    }
    Ok(bits)
}

/// Draw the original-dictionary marker for `id` as a square of `pixels` per side
pub fn render_aruco_original(id: MarkerId, pixels: u32) -> Result<RgbImage, RendererError> {
    let bits = codeword(id)?;
    if pixels < ARUCO_CELLS {
        return Err(RendererError::TooSmall { pixels });
    }

    let cell_of = |p: u32| (u64::from(p) * u64::from(ARUCO_CELLS) / u64::from(pixels)) as u32;

    Ok(RgbImage::from_fn(pixels, pixels, |x, y| {
        let (cx, cy) = (cell_of(x), cell_of(y));
        if cx == 0 || cy == 0 || cx == ARUCO_CELLS - 1 || cy == ARUCO_CELLS - 1 {
            return BLACK;
        }
        if bits[(cy - 1) as usize][(cx - 1) as usize] {
            WHITE
        } else {
            BLACK
        }
    }))
}
