use anyhow::{Context, Result};
use image::ImageFormat;
use rand::Rng;
use std::io::Cursor;
use std::path::Path;

/// Cuts a small random square out of the image and returns it as PNG bytes.
///
/// The edge length is `ratio` of the shorter side, clamped to at least
/// `min_px` and at most the shorter side. The source file is only read.
pub fn crop_fragment(path: &Path, ratio: f32, min_px: u32) -> Result<Vec<u8>> {
    let img = image::open(path)
        .with_context(|| format!("Failed to decode image {}", path.display()))?;

    let (width, height) = (img.width(), img.height());
    let shorter = width.min(height);
    let edge = ((shorter as f32 * ratio) as u32)
        .max(min_px)
        .min(shorter)
        .max(1);

    let mut rng = rand::rng();
    let left = if width > edge {
        rng.random_range(0..=width - edge)
    } else {
        0
    };
    let top = if height > edge {
        rng.random_range(0..=height - edge)
    } else {
        0
    };

    let fragment = img.crop_imm(left, top, edge, edge);

    let mut buf = Cursor::new(Vec::new());
    fragment
        .write_to(&mut buf, ImageFormat::Png)
        .context("Failed to encode crop to PNG")?;
    Ok(buf.into_inner())
}
