// src/tagger/cover.rs

use crate::error::AppResult;
use image::{DynamicImage, codecs::jpeg::JpegEncoder, imageops::FilterType};
use lofty::picture::MimeType;
use log::debug;

const QUALITY_LADDER: [u8; 4] = [85, 70, 55, 40];
const MIN_EDGE: u32 = 64;

/// 将封面重新编码为 JPEG，使其不超过 `max_bytes`。
///
/// 先按质量阶梯逐级降低，仍超限则把长边缩小到 3/4 后重试，
/// 直到长边不大于 64 像素。最终仍无法满足时返回 `Ok(None)`，调用方应放弃封面。
pub fn compress_cover(data: &[u8], max_bytes: usize) -> AppResult<Option<Vec<u8>>> {
    let mut img = image::load_from_memory(data)?;

    loop {
        for quality in QUALITY_LADDER {
            let encoded = encode_jpeg(&img, quality)?;
            debug!(
                "封面压缩尝试: {}x{} q{} -> {} 字节",
                img.width(),
                img.height(),
                quality,
                encoded.len()
            );
            if encoded.len() <= max_bytes {
                return Ok(Some(encoded));
            }
        }

        let edge = img.width().max(img.height());
        if edge <= MIN_EDGE {
            return Ok(None);
        }
        let next_edge = (edge * 3 / 4).max(MIN_EDGE);
        img = img.resize(next_edge, next_edge, FilterType::Triangle);
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> AppResult<Vec<u8>> {
    let mut buf = Vec::new();
    // JPEG 不支持 alpha 通道
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    Ok(buf)
}

/// 优先按文件头判断，其次看响应的 Content-Type，都无法判断时按 JPEG 处理。
pub(super) fn sniff_mime(data: &[u8], content_type: Option<&str>) -> MimeType {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return MimeType::Jpeg;
    }
    if data.starts_with(b"\x89PNG") {
        return MimeType::Png;
    }
    match content_type.map(str::to_ascii_lowercase) {
        Some(ct) if ct.contains("png") => MimeType::Png,
        _ => MimeType::Jpeg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn noisy_png(size: u32) -> Vec<u8> {
        let mut seed: u32 = 0x2545_F491;
        let img = RgbImage::from_fn(size, size, |_, _| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let [r, g, b, _] = seed.to_le_bytes();
            Rgb([r, g, b])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_compress_fits_under_cap() {
        let png = noisy_png(256);
        let cap = png.len() / 2;
        let jpeg = compress_cover(&png, cap).unwrap().expect("should fit");
        assert!(jpeg.len() <= cap);
        assert_eq!(sniff_mime(&jpeg, None), MimeType::Jpeg);
    }

    #[test]
    fn test_compress_gives_up_on_tiny_cap() {
        let png = noisy_png(128);
        assert!(compress_cover(&png, 16).unwrap().is_none());
    }

    #[test]
    fn test_compress_rejects_non_image() {
        let result = compress_cover(b"definitely not an image", 4);
        assert!(matches!(result, Err(AppError::Image(_))));
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0], Some("image/png")), MimeType::Jpeg);
        assert_eq!(sniff_mime(b"\x89PNG\r\n", None), MimeType::Png);
        assert_eq!(sniff_mime(b"????", Some("image/PNG")), MimeType::Png);
        assert_eq!(sniff_mime(b"????", None), MimeType::Jpeg);
    }
}
