//! Uniform border around a rendered marker

use image::{imageops, Rgb, RgbImage};

/// Fill color of marker borders
pub const BORDER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Surround `image` with `pixels` of `color` on every side
pub fn apply_border(image: &RgbImage, pixels: u32, color: Rgb<u8>) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut canvas = RgbImage::from_pixel(width + 2 * pixels, height + 2 * pixels, color);
    imageops::replace(&mut canvas, image, i64::from(pixels), i64::from(pixels));
    canvas
}
