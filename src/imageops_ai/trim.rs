use image::{GenericImageView, ImageBuffer, Pixel, Primitive, Rgba};
use num_traits::Zero;

/// Crop to the smallest rectangle holding every pixel with non-zero alpha.
///
/// An image without any visible pixel is returned unchanged, so the result is
/// never empty and never larger than the input.
pub fn trim_transparent<S>(image: ImageBuffer<Rgba<S>, Vec<S>>) -> ImageBuffer<Rgba<S>, Vec<S>>
where
    Rgba<S>: Pixel<Subpixel = S>,
    S: Primitive + 'static,
{
    match find_content_bounds(&image) {
        Some([x, y, w, h]) if (w, h) != image.dimensions() => image.view(x, y, w, h).to_image(),
        _ => image,
    }
}

/// `[x, y, width, height]` of the visible content, or `None` if fully transparent.
fn find_content_bounds<S>(image: &ImageBuffer<Rgba<S>, Vec<S>>) -> Option<[u32; 4]>
where
    Rgba<S>: Pixel<Subpixel = S>,
    S: Primitive + 'static,
{
    let (width, height) = image.dimensions();
    let mut bounds: Option<[u32; 4]> = None; // [x1, y1, x2, y2]

    for (x, y, pixel) in image.enumerate_pixels() {
        if !pixel[3].is_zero() {
            update_bounds(bounds.get_or_insert([width, height, 0, 0]), x, y);
        }
    }

    bounds.map(|[x1, y1, x2, y2]| [x1, y1, x2 - x1 + 1, y2 - y1 + 1])
}

fn update_bounds(bounds: &mut [u32; 4], x: u32, y: u32) {
    bounds[0] = bounds[0].min(x);
    bounds[1] = bounds[1].min(y);
    bounds[2] = bounds[2].max(x);
    bounds[3] = bounds[3].max(y);
}
