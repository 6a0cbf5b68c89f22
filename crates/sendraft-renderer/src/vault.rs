//! A note vault on disk as an [`AssetStore`].

use std::path::{Path, PathBuf};

use bytes::Bytes;
use ignore::WalkBuilder;

use crate::error::VaultError;
use crate::resolve::{AssetStore, StoredItem, match_link_path};

/// Files under a vault directory, listed once when the store is opened.
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
    /// Vault-relative, `/`-separated
    contents: Vec<String>,
}

impl VaultStore {
    /// Walk `root` and remember every regular file in it. Hidden files and
    /// directories (such as `.obsidian/`) are skipped.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, VaultError> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            return Err(VaultError::NotFound { path: root });
        }
        if !root.is_dir() {
            return Err(VaultError::NotADirectory { path: root });
        }

        let mut contents = Vec::new();
        for entry in WalkBuilder::new(&root)
            .standard_filters(false)
            .hidden(true)
            .follow_links(false)
            .build()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable vault entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&root) {
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                contents.push(relative);
            }
        }
        contents.sort();
        tracing::debug!(root = %root.display(), files = contents.len(), "vault scanned");

        Ok(Self { root, contents })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contents(&self) -> &[String] {
        &self.contents
    }
}

impl AssetStore for VaultStore {
    async fn lookup(&self, link_path: &str) -> Option<StoredItem> {
        match_link_path(link_path, self.contents.iter().map(String::as_str))
            .map(StoredItem::from_path)
    }

    async fn read(&self, item: &StoredItem) -> std::io::Result<Bytes> {
        tokio::fs::read(self.root.join(&item.path))
            .await
            .map(Bytes::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, contents: &[u8]) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = VaultStore::open(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, VaultError::NotFound { .. }));
    }

    #[test]
    fn test_file_root() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "note.md", b"hi");
        let err = VaultStore::open(dir.path().join("note.md")).unwrap_err();
        assert!(matches!(err, VaultError::NotADirectory { .. }));
    }

    #[test]
    fn test_lists_files_skipping_hidden() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "note.md", b"hi");
        write(dir.path(), "attachments/a.png", b"png");
        write(dir.path(), ".obsidian/app.json", b"{}");
        let vault = VaultStore::open(dir.path()).unwrap();
        assert_eq!(vault.contents(), ["attachments/a.png", "note.md"]);
    }

    #[tokio::test]
    async fn test_lookup_and_read() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "attachments/a.png", b"png bytes");
        let vault = VaultStore::open(dir.path()).unwrap();

        let item = vault.lookup("a.png").await.unwrap();
        assert_eq!(item.path, "attachments/a.png");
        assert_eq!(item.extension, "png");
        assert_eq!(vault.read(&item).await.unwrap(), Bytes::from_static(b"png bytes"));
        assert!(vault.lookup("b.png").await.is_none());
    }
}
