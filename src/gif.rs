//! Raster image to GIF conversion.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::gif::GifEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

use crate::detect::{detect_format_from_bytes, FileFormat};
use crate::error::{Error, Result};

/// Default output width in pixels.
pub const DEFAULT_WIDTH: u32 = 1500;

/// Resize to `width`, keeping the aspect ratio. Height is at least 1.
pub fn resize_to_width(img: &DynamicImage, width: u32) -> DynamicImage {
    let (w, h) = (img.width().max(1), img.height());
    let height = ((width as u64 * h as u64) / w as u64).max(1) as u32;
    img.resize_exact(width, height, FilterType::Lanczos3)
}

/// Composite any alpha channel over a white background.
pub fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

/// Decode an image, resize it and encode a single-frame GIF.
///
/// Returns the GIF bytes and the output dimensions.
pub fn convert_bytes_to_gif(bytes: &[u8], width: u32) -> Result<(Vec<u8>, (u32, u32))> {
    if width == 0 {
        return Err(Error::Image("output width must be at least 1 pixel".into()));
    }
    if let Ok(format) = detect_format_from_bytes(bytes) {
        if format.is_vector() {
            return Err(Error::VectorImage(format.name(), format.extension()));
        }
        if matches!(format, FileFormat::Pdf { .. } | FileFormat::Zip | FileFormat::Ole2) {
            return Err(Error::Image(format!("{} is not an image", format)));
        }
    }

    let img = image::load_from_memory(bytes)?;
    let resized = resize_to_width(&img, width);
    let rgb = flatten_on_white(&resized);
    let dims = rgb.dimensions();

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(Cursor::new(&mut out));
        encoder.encode_frame(image::Frame::new(DynamicImage::ImageRgb8(rgb).to_rgba8()))?;
    }
    Ok((out, dims))
}

/// Convert an image file to a GIF file.
pub fn convert_file(input: &Path, output: &Path, width: u32) -> Result<(u32, u32)> {
    let bytes = fs::read(input)?;
    let (gif, dims) = convert_bytes_to_gif(&bytes, width)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, gif)?;
    log::info!(
        "Converted {} -> {} ({}x{})",
        input.display(),
        output.display(),
        dims.0,
        dims.1
    );
    Ok(dims)
}
