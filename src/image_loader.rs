//! Image resources: format sniffing, pixel dimensions and PDF-ready data.
//!
//! Resource payloads are raw bytes (the document decodes base64 on
//! ingestion). JPEG data is kept as is, since PDF embeds it with DCTDecode.
//! PNG data is decoded into RGB samples plus an alpha channel when any pixel
//! is not opaque.

use std::io::Cursor;

use crate::error::BackendError;

/// An image decoded far enough to be embedded.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub samples: ImageSamples,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone)]
pub enum ImageSamples {
    Jpeg {
        data: Vec<u8>,
        gray: bool,
    },
    Rgb {
        /// `width × height × 3` bytes.
        rgb: Vec<u8>,
        /// `width × height` bytes, `None` when fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Guess the format from magic bytes.
pub fn sniff(data: &[u8]) -> Option<ImageFormat> {
    if data.starts_with(&[0xFF, 0xD8]) {
        Some(ImageFormat::Jpeg)
    } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some(ImageFormat::Png)
    } else {
        None
    }
}

fn reader(data: &[u8]) -> Result<image::io::Reader<Cursor<&[u8]>>, BackendError> {
    if sniff(data).is_none() {
        return Err(BackendError::Image(
            "unsupported image format (expected JPEG or PNG)".to_string(),
        ));
    }
    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| BackendError::Image(format!("cannot read image header: {e}")))
}

/// Pixel width and height, read from the header only.
pub fn dimensions(data: &[u8]) -> Result<(u32, u32), BackendError> {
    reader(data)?
        .into_dimensions()
        .map_err(|e| BackendError::Image(format!("cannot read image dimensions: {e}")))
}

/// Prepare image bytes for embedding.
pub fn load(data: &[u8]) -> Result<LoadedImage, BackendError> {
    match sniff(data) {
        Some(ImageFormat::Jpeg) => {
            let (width_px, height_px) = dimensions(data)?;
            Ok(LoadedImage {
                samples: ImageSamples::Jpeg {
                    data: data.to_vec(),
                    gray: jpeg_components(data) == Some(1),
                },
                width_px,
                height_px,
            })
        }
        Some(ImageFormat::Png) => decode_png(data),
        None => Err(BackendError::Image(
            "unsupported image format (expected JPEG or PNG)".to_string(),
        )),
    }
}

/// Component count from the first start-of-frame segment.
fn jpeg_components(data: &[u8]) -> Option<u8> {
    let mut i = 2;
    while i + 3 < data.len() && data[i] == 0xFF {
        let marker = data[i + 1];
        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            return data.get(i + 9).copied();
        }
        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + length;
    }
    None
}

fn decode_png(data: &[u8]) -> Result<LoadedImage, BackendError> {
    let decoded = reader(data)?
        .decode()
        .map_err(|e| BackendError::Image(format!("cannot decode PNG: {e}")))?
        .to_rgba8();
    let (width_px, height_px) = decoded.dimensions();

    let pixels = (width_px as usize) * (height_px as usize);
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in decoded.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }
    let opaque = alpha.iter().all(|a| *a == 255);

    Ok(LoadedImage {
        samples: ImageSamples::Rgb {
            rgb,
            alpha: (!opaque).then_some(alpha),
        },
        width_px,
        height_px,
    })
}
