//! 3x3 convolution helpers shared by sharpness scoring and enhancement.
//!
//! Borders use reflect-101 (`dcb|abcd|cba`): the edge pixel itself is not
//! repeated. Both the Laplacian and the sharpening kernel go through
//! [`reflect_101`], so the two stages always agree on border handling.

use image::{GrayImage, RgbImage};

/// Laplacian kernel, row-major: [[0, 1, 0], [1, -4, 1], [0, 1, 0]]
pub const LAPLACIAN_KERNEL: [i32; 9] = [0, 1, 0, 1, -4, 1, 0, 1, 0];

/// Map a possibly out-of-range coordinate back into `0..len` by reflect-101.
///
/// Only offsets of one pixel past either edge are expected (3x3 kernels).
pub fn reflect_101(index: i64, len: u32) -> u32 {
    let len = len as i64;
    if len <= 1 {
        return 0;
    }
    let reflected = if index < 0 {
        -index
    } else if index >= len {
        2 * (len - 1) - index
    } else {
        index
    };
    reflected.clamp(0, len - 1) as u32
}

/// Integer Laplacian response at (x, y).
pub fn laplacian_at(image: &GrayImage, x: u32, y: u32) -> i32 {
    let (width, height) = image.dimensions();
    let mut acc = 0i32;
    for ky in 0..3i64 {
        let sy = reflect_101(y as i64 + ky - 1, height);
        for kx in 0..3i64 {
            let weight = LAPLACIAN_KERNEL[(ky * 3 + kx) as usize];
            if weight == 0 {
                continue;
            }
            let sx = reflect_101(x as i64 + kx - 1, width);
            acc += weight * image.get_pixel(sx, sy)[0] as i32;
        }
    }
    acc
}

/// Convolve every channel of an RGB image with a 3x3 kernel.
///
/// Output has the input's size; each value is rounded and saturated to `u8`.
pub fn convolve3x3_rgb(image: &RgbImage, kernel: &[f32; 9]) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut output = RgbImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0f32; 3];
            for ky in 0..3i64 {
                let sy = reflect_101(y as i64 + ky - 1, height);
                for kx in 0..3i64 {
                    let weight = kernel[(ky * 3 + kx) as usize];
                    if weight == 0.0 {
                        continue;
                    }
                    let sx = reflect_101(x as i64 + kx - 1, width);
                    let source = image.get_pixel(sx, sy);
                    for (channel, value) in acc.iter_mut().enumerate() {
                        *value += weight * source[channel] as f32;
                    }
                }
            }
            output.put_pixel(x, y, image::Rgb(acc.map(saturate_u8)));
        }
    }

    output
}

/// Round to nearest and clamp into the 8-bit range.
pub fn saturate_u8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}
