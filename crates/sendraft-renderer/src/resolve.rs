//! Turning a marker's path token into image bytes.
//!
//! Lookup goes through the [`AssetStore`] capability, which resolves link-style paths the
//! way a note vault does: a bare file name finds the file wherever it lives, a partial path
//! matches on whole path components, and no base directory is involved.

use std::sync::LazyLock;

use bytes::Bytes;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::types::{ImageKind, ImageReference, ResolvedAsset, SkipReason};

/// Splits `file#section|label` link targets.
pub static LINK_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>[^#|]+)??(#(?P<section>.+?))??(\|(?P<label>.+?))??$").unwrap()
});

/// An item found in an asset store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    /// Store-relative path, `/`-separated
    pub path: String,
    pub file_name: String,
    /// Extension without the dot, as it appears on disk
    pub extension: String,
}

impl StoredItem {
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let file_name = path.rsplit('/').next().unwrap_or(&path).to_owned();
        let extension = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_owned(),
            _ => String::new(),
        };
        Self {
            path,
            file_name,
            extension,
        }
    }
}

/// Where image bytes come from.
#[trait_variant::make(Send)]
pub trait AssetStore {
    /// Find the item a link path points at, if any.
    async fn lookup(&self, link_path: &str) -> Option<StoredItem>;

    /// Load the raw bytes of an item returned by [`AssetStore::lookup`].
    async fn read(&self, item: &StoredItem) -> std::io::Result<Bytes>;
}

/// Tokens that already point somewhere else and are never looked up.
pub fn is_remote(path: &str) -> bool {
    let lowered = path.trim_start().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://") || lowered.starts_with("data:")
}

/// The file part of a link target, without `#section` or `|label` suffixes.
pub fn link_path(token: &str) -> Option<&str> {
    let token = token.trim();
    LINK_TARGET_RE
        .captures(token)
        .and_then(|caps| caps.name("file"))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

fn normalize(path: &str) -> String {
    let path: String = path.nfc().collect();
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").trim_start_matches('/').to_owned()
}

fn suffix_match(candidate: &str, link: &str) -> bool {
    candidate == link
        || candidate
            .strip_suffix(link)
            .is_some_and(|prefix| prefix.ends_with('/'))
}

/// Pick the path a link points at out of `candidates`.
///
/// Preference order: exact match, then a match on trailing path components, then the same
/// ignoring case. Within a tier the shallowest path wins, then the lexically first.
pub fn match_link_path<'a, I>(link: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let link = normalize(link);
    if link.is_empty() {
        return None;
    }
    let link_lower = link.to_lowercase();

    let mut best: Option<(u8, usize, &'a str)> = None;
    for candidate in candidates {
        let normalized = normalize(candidate);
        let tier = if normalized == link {
            0
        } else if suffix_match(&normalized, &link) {
            1
        } else if suffix_match(&normalized.to_lowercase(), &link_lower) {
            2
        } else {
            continue;
        };
        let depth = normalized.matches('/').count();
        let key = (tier, depth, candidate);
        if best.is_none_or(|current| key < current) {
            best = Some(key);
        }
    }
    best.map(|(_, _, path)| path)
}

/// Resolve one reference to an uploadable asset, or say why it is skipped.
#[tracing::instrument(skip(store, reference), fields(path = %reference.path))]
pub async fn resolve_asset<S: AssetStore>(
    store: &S,
    reference: &ImageReference,
) -> Result<ResolvedAsset, SkipReason> {
    if is_remote(&reference.path) {
        return Err(SkipReason::RemoteUrl);
    }
    let link = link_path(&reference.path).ok_or(SkipReason::Unresolved)?;
    let item = store.lookup(link).await.ok_or(SkipReason::Unresolved)?;

    let kind = ImageKind::from_extension(&item.extension).ok_or_else(|| {
        SkipReason::UnsupportedType {
            extension: item.extension.to_lowercase(),
        }
    })?;

    let bytes = store.read(&item).await.map_err(|e| {
        tracing::warn!(item = %item.path, error = %e, "failed to read image");
        SkipReason::Unreadable {
            message: e.to_string(),
        }
    })?;
    tracing::debug!(item = %item.path, bytes = bytes.len(), "read image");

    ResolvedAsset::from_bytes(item.file_name, kind, bytes)
}

/// An [`AssetStore`] over a fixed set of in-memory files.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Vec<(String, Bytes)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Bytes>) {
        let path = path.into();
        let bytes = bytes.into();
        match self.files.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = bytes,
            None => self.files.push((path, bytes)),
        }
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetStore for MemoryStore {
    async fn lookup(&self, link_path: &str) -> Option<StoredItem> {
        match_link_path(link_path, self.files.iter().map(|(p, _)| p.as_str()))
            .map(StoredItem::from_path)
    }

    async fn read(&self, item: &StoredItem) -> std::io::Result<Bytes> {
        self.files
            .iter()
            .find(|(p, _)| *p == item.path)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }
}
