//! Downscaling images that exceed the configured size.

use std::io::Cursor;

use bytes::Bytes;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use sendraft_common::{ResizeConfig, ResizeMode};

use crate::error::TransformError;
use crate::types::{ImageKind, ResolvedAsset, Resize};

const JPEG_QUALITY: u8 = 90;

/// Bytes ready for upload.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub bytes: Bytes,
    /// Present only if the image was actually resized
    pub resize: Option<Resize>,
}

/// `side * num / den`, rounded to nearest, never below 1.
fn scale(side: u32, num: u32, den: u32) -> u32 {
    let den = u64::from(den.max(1));
    let scaled = (u64::from(side) * u64::from(num) + den / 2) / den;
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// New dimensions for an image, or `None` if it already fits.
///
/// The constrained side lands exactly on the limit; the other side keeps the aspect ratio.
pub fn target_dimensions(width: u32, height: u32, config: &ResizeConfig) -> Option<(u32, u32)> {
    let limit = config.limit.get();
    match config.mode {
        ResizeMode::Longest if width.max(height) <= limit => None,
        ResizeMode::Longest if width >= height => Some((limit, scale(height, limit, width))),
        ResizeMode::Longest => Some((scale(width, limit, height), limit)),
        ResizeMode::Width => (width > limit).then(|| (limit, scale(height, limit, width))),
        ResizeMode::Height => (height > limit).then(|| (scale(width, limit, height), limit)),
    }
}

/// Apply the resize settings to an asset.
///
/// Images that already fit are passed through byte for byte. Resized images are
/// re-encoded in their original format.
pub fn transform(asset: &ResolvedAsset, config: &ResizeConfig) -> Result<Transformed, TransformError> {
    let Some((width, height)) = target_dimensions(asset.width(), asset.height(), config) else {
        return Ok(Transformed {
            bytes: asset.bytes().clone(),
            resize: None,
        });
    };

    let image = image::load_from_memory(asset.bytes()).map_err(|source| TransformError::Decode {
        file_name: asset.file_name().to_owned(),
        source,
    })?;
    let resized = image.resize_exact(width, height, FilterType::Lanczos3);
    let bytes = encode(&resized, asset.kind()).map_err(|source| TransformError::Encode {
        file_name: asset.file_name().to_owned(),
        source,
    })?;

    tracing::debug!(
        file = asset.file_name(),
        from = ?(asset.width(), asset.height()),
        to = ?(width, height),
        bytes = bytes.len(),
        "resized image"
    );

    Ok(Transformed {
        bytes: Bytes::from(bytes),
        resize: Some(Resize {
            from: (asset.width(), asset.height()),
            to: (width, height),
        }),
    })
}

fn encode(image: &DynamicImage, kind: ImageKind) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    match kind {
        ImageKind::Jpeg => {
            // no alpha channel in JPEG
            JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(&image.to_rgb8())?;
        }
        ImageKind::Png => image.write_to(&mut Cursor::new(&mut buf), kind.format())?,
        ImageKind::Gif | ImageKind::WebP => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_to(&mut Cursor::new(&mut buf), kind.format())?,
    }
    Ok(buf)
}
