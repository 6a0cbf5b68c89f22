use std::fmt;
use std::io::Cursor;
use std::ops::Range;

use bytes::Bytes;
use http::StatusCode;
use image::{ImageFormat, ImageReader};

/// The two ways a note can embed an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerSyntax {
    /// `![alt](path)`
    Markdown,
    /// `![[path]]`
    Wikilink,
}

/// One image marker found in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// The marker exactly as it appears in the text
    pub raw: String,
    /// Alt text, always empty for wikilink embeds
    pub alt: String,
    /// The path token between the delimiters, unmodified
    pub path: String,
    pub syntax: MarkerSyntax,
    /// Byte range of the marker in the original text
    pub span: Range<usize>,
}

/// Image types that can be uploaded, with their wire and codec identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ImageKind {
    /// Map a file extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }

    pub fn format(&self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Image data loaded from the asset store.
///
/// Only constructed through [`ResolvedAsset::from_bytes`], so the bytes are never empty
/// and the dimensions come from the image header.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    bytes: Bytes,
    kind: ImageKind,
    width: u32,
    height: u32,
    file_name: String,
}

impl ResolvedAsset {
    pub fn from_bytes(
        file_name: impl Into<String>,
        kind: ImageKind,
        bytes: Bytes,
    ) -> Result<Self, SkipReason> {
        if bytes.is_empty() {
            return Err(SkipReason::Empty);
        }
        // Sniff rather than trust the extension; misnamed files still upload under their
        // extension's MIME type.
        let unreadable = |message: String| SkipReason::Unreadable { message };
        let (width, height) = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| unreadable(e.to_string()))?
            .into_dimensions()
            .map_err(|e| unreadable(e.to_string()))?;
        Ok(Self {
            bytes,
            kind,
            width,
            height,
            file_name: file_name.into(),
        })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Why a reference was left alone without attempting an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Already points at a hosted URL
    RemoteUrl,
    /// Nothing in the asset store matches the path
    Unresolved,
    UnsupportedType { extension: String },
    /// The file could not be read or its header could not be decoded
    Unreadable { message: String },
    Empty,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteUrl => f.write_str("remote url"),
            Self::Unresolved => f.write_str("not found"),
            Self::UnsupportedType { extension } if extension.is_empty() => {
                f.write_str("unsupported file type")
            }
            Self::UnsupportedType { extension } => write!(f, "unsupported file type .{extension}"),
            Self::Unreadable { message } => write!(f, "unreadable: {message}"),
            Self::Empty => f.write_str("empty file"),
        }
    }
}

/// Result of trying to upload one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success { url: String },
    /// The API rejected the key (403)
    AuthFailure,
    HttpFailure { status: StatusCode, body: String },
    /// No response was received
    NetworkFailure { message: String },
    Skipped(SkipReason),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthFailure | Self::HttpFailure { .. } | Self::NetworkFailure { .. }
        )
    }
}

/// Dimensions before and after a downscale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    pub from: (u32, u32),
    pub to: (u32, u32),
}

/// What happened to one reference during a run.
#[derive(Debug, Clone)]
pub struct ReferenceReport {
    pub reference: ImageReference,
    /// File name of the resolved asset, if it resolved
    pub file_name: Option<String>,
    /// Set only when the image was actually downscaled
    pub resize: Option<Resize>,
    pub outcome: UploadOutcome,
}

impl ReferenceReport {
    pub(crate) fn skipped(reference: ImageReference, reason: SkipReason) -> Self {
        Self {
            reference,
            file_name: None,
            resize: None,
            outcome: UploadOutcome::Skipped(reason),
        }
    }

    /// Name to show the user: the file name when known, else the raw path token.
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(&self.reference.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishFailure {
    Http { status: StatusCode, body: String },
    Network { message: String },
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::Network { message } => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Draft created; `id` is the draft id when the API returned one
    Published { id: Option<String> },
    Failed(PublishFailure),
}

/// Everything a run produced, for the caller to present.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The rewritten document body that was submitted
    pub body: String,
    pub references: Vec<ReferenceReport>,
    pub publish: PublishOutcome,
}

impl PipelineResult {
    pub fn is_published(&self) -> bool {
        matches!(self.publish, PublishOutcome::Published { .. })
    }

    pub fn uploaded(&self) -> usize {
        self.references
            .iter()
            .filter(|r| r.outcome.is_success())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(ImageKind::from_extension("PNG"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_extension("jpg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("JPEG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("gif"), Some(ImageKind::Gif));
        assert_eq!(ImageKind::from_extension("WebP"), Some(ImageKind::WebP));
        assert_eq!(ImageKind::from_extension("svg"), None);
        assert_eq!(ImageKind::from_extension(""), None);
        assert_eq!(ImageKind::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let err = ResolvedAsset::from_bytes("a.png", ImageKind::Png, Bytes::new()).unwrap_err();
        assert_eq!(err, SkipReason::Empty);
    }

    #[test]
    fn test_garbage_bytes_unreadable() {
        let err = ResolvedAsset::from_bytes(
            "a.png",
            ImageKind::Png,
            Bytes::from_static(b"definitely not a png"),
        )
        .unwrap_err();
        assert!(matches!(err, SkipReason::Unreadable { .. }));
    }

    #[test]
    fn test_dimensions_from_header() {
        let mut buf = Vec::new();
        image::RgbImage::new(7, 3)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let asset = ResolvedAsset::from_bytes("a.png", ImageKind::Png, Bytes::from(buf)).unwrap();
        assert_eq!((asset.width(), asset.height()), (7, 3));
        assert_eq!(asset.file_name(), "a.png");
    }
}
