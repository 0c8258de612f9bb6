use image::{ImageBuffer, Pixel, Primitive, Rgba};
use num_traits::NumCast;

use crate::imageops_ai::get_max_value;

/// Binarize the alpha channel in place: below `threshold` becomes fully
/// transparent, everything else fully opaque.
///
/// `threshold` is on the 8-bit scale and is rescaled for wider subpixels.
pub fn harden_alpha<S>(image: &mut ImageBuffer<Rgba<S>, Vec<S>>, threshold: u8)
where
    Rgba<S>: Pixel<Subpixel = S>,
    S: Primitive + 'static,
{
    let max = get_max_value::<S>();
    let scale = max.to_f64().unwrap_or(255.0) / 255.0;
    let threshold = <S as NumCast>::from(<f64 as From<u8>>::from(threshold) * scale).unwrap_or(max);

    for pixel in image.pixels_mut() {
        let Rgba([_, _, _, alpha]) = pixel;
        *alpha = if *alpha < threshold { S::zero() } else { max };
    }
}
