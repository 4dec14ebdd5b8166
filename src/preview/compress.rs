use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb};

/// Compress raw RGB pixel data to JPEG at the given quality (1-100).
///
/// Returns `None` when the buffer does not match the stated dimensions or
/// the encoder fails; the caller treats this as a dropped frame.
pub fn compress_jpeg(data: &[u8], width: u32, height: u32, quality: u8) -> Option<Vec<u8>> {
    let img: ImageBuffer<Rgb<u8>, _> = ImageBuffer::from_raw(width, height, data)?;

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    img.write_with_encoder(encoder).ok()?;
    Some(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a synthetic RGB test image (gradient pattern).
    fn make_test_rgb(width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push((x % 256) as u8); // R
                data.push((y % 256) as u8); // G
                data.push(128); // B
            }
        }
        data
    }

    #[test]
    fn compress_jpeg_produces_valid_jpeg_bytes() {
        let rgb = make_test_rgb(640, 480);
        let jpeg = compress_jpeg(&rgb, 640, 480, 85).unwrap();
        // JPEG files start with FF D8
        assert_eq!(jpeg[0], 0xFF);
        assert_eq!(jpeg[1], 0xD8);
    }

    #[test]
    fn compress_jpeg_1080p_at_quality_85_under_300kb() {
        let rgb = make_test_rgb(1920, 1080);
        let jpeg = compress_jpeg(&rgb, 1920, 1080, 85).unwrap();
        assert!(
            jpeg.len() < 300_000,
            "JPEG size {} exceeds 300KB",
            jpeg.len()
        );
    }

    #[test]
    fn compress_jpeg_lower_quality_produces_smaller_output() {
        let rgb = make_test_rgb(1920, 1080);
        let high = compress_jpeg(&rgb, 1920, 1080, 85).unwrap();
        let low = compress_jpeg(&rgb, 1920, 1080, 50).unwrap();
        assert!(
            low.len() < high.len(),
            "quality 50 ({}) should be smaller than quality 85 ({})",
            low.len(),
            high.len()
        );
    }

    #[test]
    fn compress_jpeg_rejects_mismatched_buffer() {
        let rgb = make_test_rgb(10, 10);
        assert!(compress_jpeg(&rgb, 640, 480, 85).is_none());
    }
}
