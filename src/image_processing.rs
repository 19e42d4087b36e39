use anyhow::{Result, anyhow};
use image::{DynamicImage, ImageFormat};

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}

pub fn mime_to_format(mime_type: &str) -> Result<ImageFormat> {
    match mime_type {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Ok(ImageFormat::Jpeg),
        "image/gif" => Ok(ImageFormat::Gif),
        "image/webp" => Ok(ImageFormat::WebP),
        "image/bmp" => Ok(ImageFormat::Bmp),
        _ => Err(anyhow!("unsupported mime type: {mime_type}")),
    }
}

/// Decodes bytes, trusting the magic bytes over the declared MIME type.
pub fn load_image(bytes: &[u8], declared_mime: Option<&str>) -> Result<DynamicImage> {
    let mime_type = detect_mime_type(bytes)
        .or(declared_mime)
        .ok_or_else(|| anyhow!("unsupported image type"))?;
    let format = mime_to_format(mime_type)?;
    image::load_from_memory_with_format(bytes, format)
        .map_err(|err| anyhow!("decode image failed: {err}"))
}

/// Converts to 8-bit RGB, or RGBA when the source carries an alpha channel.
pub fn normalize_color(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|err| anyhow!("encode png failed: {err}"))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(
            detect_mime_type(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            Some("image/png")
        );
        assert_eq!(detect_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(detect_mime_type(b"{\"artifacts\":[]}"), None);
    }

    #[test]
    fn grayscale_becomes_rgb() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([128])));
        let normalized = normalize_color(gray);
        assert!(matches!(normalized, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn alpha_survives_normalization() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4])));
        let png = encode_png(&rgba).unwrap();
        let decoded = load_image(&png, None).unwrap();
        assert!(matches!(normalize_color(decoded), DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn rejects_unknown_bytes() {
        assert!(load_image(b"not an image", None).is_err());
        assert!(load_image(b"not an image", Some("text/plain")).is_err());
    }
}
