//! PNG encoding for RGBA figures.
//!
//! Writes color type 6 (8-bit RGBA) with optional `tEXt` metadata chunks,
//! so a rendered map carries its title and source alongside the pixels.

use std::io::Write;

use crate::error::{RenderError, RenderResult};

/// Eight-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Encode RGBA pixels (4 bytes per pixel, row-major) as PNG.
pub fn encode_rgba(pixels: &[u8], width: u32, height: u32) -> RenderResult<Vec<u8>> {
    encode_rgba_with_text(pixels, width, height, &[])
}

/// Encode RGBA pixels with `(keyword, text)` metadata entries.
///
/// Keywords must be 1-79 printable Latin-1 characters.
pub fn encode_rgba_with_text(
    pixels: &[u8],
    width: u32,
    height: u32,
    text: &[(&str, &str)],
) -> RenderResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidCanvas { width, height });
    }
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(RenderError::ShapeMismatch {
            context: "png pixel buffer".to_string(),
            expected: vec![expected],
            actual: vec![pixels.len()],
        });
    }

    let mut png = Vec::with_capacity(expected / 4);
    png.extend_from_slice(&PNG_SIGNATURE);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&width.to_be_bytes());
    ihdr_data.extend_from_slice(&height.to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(6); // color type (RGBA)
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    for (keyword, value) in text {
        write_chunk(&mut png, b"tEXt", &text_chunk(keyword, value)?);
    }

    let idat_data = deflate_idat_rgba(pixels, width as usize, height as usize)
        .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// `keyword NUL text`, both Latin-1.
fn text_chunk(keyword: &str, value: &str) -> RenderResult<Vec<u8>> {
    let valid_keyword = !keyword.is_empty()
        && keyword.len() <= 79
        && keyword.chars().all(|c| (' '..='~').contains(&c))
        && !keyword.starts_with(' ')
        && !keyword.ends_with(' ');
    if !valid_keyword {
        return Err(RenderError::Encode(format!(
            "invalid tEXt keyword {:?}",
            keyword
        )));
    }

    let mut data = Vec::with_capacity(keyword.len() + 1 + value.len());
    data.extend_from_slice(keyword.as_bytes());
    data.push(0);
    // Characters outside Latin-1 are replaced.
    data.extend(value.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')));
    Ok(data)
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Deflate RGBA image data for IDAT chunk.
fn deflate_idat_rgba(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    // Add filter byte (0 = no filter) to each scanline
    let stride = width * 4;
    let mut uncompressed = Vec::with_capacity(height * (1 + stride));
    for row in pixels.chunks_exact(stride) {
        uncompressed.push(0);
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_buffer() {
        let err = encode_rgba(&[0u8; 12], 2, 2).unwrap_err();
        assert!(matches!(err, RenderError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_rejects_empty_canvas() {
        assert!(matches!(
            encode_rgba(&[], 0, 4),
            Err(RenderError::InvalidCanvas { width: 0, height: 4 })
        ));
    }

    #[test]
    fn test_text_chunk_layout() {
        let data = text_chunk("Title", "Temperature (\u{00b0}F)").unwrap();
        assert_eq!(&data[..6], b"Title\0");
        // the degree sign is Latin-1 0xB0
        assert!(data.contains(&0xB0));
    }

    #[test]
    fn test_invalid_keyword() {
        assert!(text_chunk("", "x").is_err());
        assert!(text_chunk(" padded", "x").is_err());
        assert!(text_chunk(&"k".repeat(80), "x").is_err());
    }
}
