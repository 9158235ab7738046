//! Built-in marker pattern: the 16 ID bits on a 4x4 grid
//!
//! The pattern is a 6x6 cell square: a one-cell black frame around 4x4 data
//! cells, most significant bit top-left, white for a set bit. It is not an
//! ArUco dictionary codeword.

use image::{Rgb, RgbImage};

use super::RendererError;
use crate::ids::MarkerId;

/// Cells per side, frame included
pub const GRID_CELLS: u32 = 6;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Draw the marker for `id` as a square image of `pixels` per side
pub fn render_bit_grid(id: MarkerId, pixels: u32) -> Result<RgbImage, RendererError> {
    if pixels < GRID_CELLS {
        return Err(RendererError::TooSmall { pixels });
    }

    let cell_of = |p: u32| (u64::from(p) * u64::from(GRID_CELLS) / u64::from(pixels)) as u32;
    let bits = id.value();

    Ok(RgbImage::from_fn(pixels, pixels, |x, y| {
        let (cx, cy) = (cell_of(x), cell_of(y));
        if cx == 0 || cy == 0 || cx == GRID_CELLS - 1 || cy == GRID_CELLS - 1 {
            return BLACK;
        }
        let index = (cy - 1) * (GRID_CELLS - 2) + (cx - 1);
        if bits >> (15 - index) & 1 == 1 {
            WHITE
        } else {
            BLACK
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sample the center pixel of a data cell
    fn cell(image: &RgbImage, cx: u32, cy: u32) -> Rgb<u8> {
        let step = image.width() / GRID_CELLS;
        *image.get_pixel(cx * step + step / 2, cy * step + step / 2)
    }

    #[test]
    fn test_frame_is_black() {
        let image = render_bit_grid(MarkerId(u16::MAX), 60).expect("Should render");
        for i in 0..GRID_CELLS {
            assert_eq!(cell(&image, i, 0), BLACK);
            assert_eq!(cell(&image, 0, i), BLACK);
            assert_eq!(cell(&image, i, GRID_CELLS - 1), BLACK);
            assert_eq!(cell(&image, GRID_CELLS - 1, i), BLACK);
        }
        assert_eq!(cell(&image, 1, 1), WHITE);
    }

    #[test]
    fn test_bits_are_msb_first() {
        // 0b1000_0000_0000_0001: first and last data cells set
        let image = render_bit_grid(MarkerId(0x8001), 60).expect("Should render");
        assert_eq!(cell(&image, 1, 1), WHITE);
        assert_eq!(cell(&image, 2, 1), BLACK);
        assert_eq!(cell(&image, 4, 4), WHITE);
        assert_eq!(cell(&image, 3, 4), BLACK);
    }

    #[test]
    fn test_uneven_sizes_cover_whole_image() {
        let image = render_bit_grid(MarkerId(5), 1285).expect("Should render");
        assert_eq!(image.dimensions(), (1285, 1285));
        assert_eq!(*image.get_pixel(1284, 1284), BLACK);
    }

    #[test]
    fn test_too_small() {
        assert!(matches!(
            render_bit_grid(MarkerId(1), 5),
            Err(RendererError::TooSmall { pixels: 5 })
        ));
    }
}
