//! Image encoding: `DynamicImage` → PNG bytes for capability requests.
//!
//! PNG is chosen over JPEG because it is lossless — glyph crispness matters
//! far more than payload size for text detection, and compression artefacts
//! around high-contrast edges measurably hurt recall on small fonts.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG bytes ready for a capability call.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded image → {} PNG bytes", buf.len());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let bytes = encode_png(&img).expect("encode should succeed");
        // PNG magic
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
        let back = image::load_from_memory(&bytes).expect("round-trip decode");
        assert_eq!(back.width(), 10);
    }
}
