use image::{GrayImage, Rgba, RgbImage, RgbaImage};

/// Cut-out of `image` with `mask` as its alpha channel.
///
/// `premultiply` scales colour by the mask, the result of compositing the
/// image over a fully transparent canvas. `None` if the sizes differ.
pub fn composite(image: &RgbImage, mask: &GrayImage, premultiply: bool) -> Option<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return None;
    }

    let (width, height) = image.dimensions();
    Some(RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let alpha = mask.get_pixel(x, y).0[0];
        if premultiply {
            let scale = |c: u8| ((u16::from(c) * u16::from(alpha) + 127) / 255) as u8;
            Rgba([scale(r), scale(g), scale(b), alpha])
        } else {
            Rgba([r, g, b, alpha])
        }
    }))
}
