use image::{Rgba, RgbaImage};

use crate::config::ArtworkConfig;

/// Opacity at the top edge of the reflection (0xcf, about 81 %).
pub const DEFAULT_START_ALPHA: u8 = 0xcf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflectionOptions {
    pub start_alpha: u8,
}

impl Default for ReflectionOptions {
    fn default() -> Self {
        Self {
            start_alpha: DEFAULT_START_ALPHA,
        }
    }
}

impl ReflectionOptions {
    pub fn from_config(config: &ArtworkConfig) -> Self {
        Self {
            start_alpha: config.reflection_start_alpha,
        }
    }
}

/// Builds the glossy-shelf reflection shown under the album art.
///
/// The output is as wide as `image` and half as tall (rounded down). It holds
/// the bottom half of the source flipped vertically, with a linear fade from
/// `start_alpha` at the top to fully transparent at the bottom applied as a
/// destination-in mask: colours are kept, source alpha is scaled.
pub fn render_reflection(image: &RgbaImage, options: &ReflectionOptions) -> RgbaImage {
    let width = image.width();
    let half = image.height() / 2;
    let mut output = RgbaImage::new(width, half);
    if width == 0 || half == 0 {
        return output;
    }

    let start_alpha = f32::from(options.start_alpha);

    for y in 0..half {
        // Rows half..2*half of the source, bottom row first.
        let src_y = half + (half - 1 - y);
        let mask = gradient_alpha(start_alpha, y, half);
        for x in 0..width {
            let Rgba([r, g, b, a]) = *image.get_pixel(x, src_y);
            output.put_pixel(x, y, Rgba([r, g, b, destination_in(a, mask)]));
        }
    }

    output
}

fn gradient_alpha(start_alpha: f32, row: u32, height: u32) -> f32 {
    let t = (row as f32 + 0.5) / height as f32;
    (start_alpha * (1.0 - t)).clamp(0.0, 255.0)
}

fn destination_in(dst_alpha: u8, mask_alpha: f32) -> u8 {
    (f32::from(dst_alpha) * mask_alpha / 255.0)
        .round()
        .clamp(0.0, 255.0) as u8
}
