//! Uploaded menus and photos on local disk.
//!
//! Stored paths are relative to the uploads root and are served under
//! `/uploads/`.

use crate::random::unique_suffix;
use axum::body::Bytes;
use menuqr_core::RestaurantId;
use menuqr_core::slug::slugify;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    /// MIME type as sent by the client, lowercased.
    #[must_use]
    pub fn mime(&self) -> String {
        self.content_type
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime().starts_with("image/")
    }

    fn stem(&self) -> String {
        let stem = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).file_stem())
            .and_then(|s| s.to_str())
            .map(slugify)
            .unwrap_or_default();
        if stem.is_empty() { "file".to_string() } else { stem }
    }

    fn extension(&self) -> String {
        extension_for(&self.mime(), self.file_name.as_deref())
    }
}

/// File extension for a MIME type, else the client name's, else `bin`.
#[must_use]
pub fn extension_for(mime: &str, file_name: Option<&str>) -> String {
    let known = match mime {
        "application/pdf" => Some("pdf"),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

/// True when `relative` stays inside the uploads root.
#[must_use]
pub fn is_safe_relative(relative: &str) -> bool {
    let path = Path::new(relative);
    !relative.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Disk storage rooted at the configured uploads directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `menus/{restaurant}/{stem}-{unique}.{ext}`
    pub async fn save_menu(&self, restaurant_id: RestaurantId, upload: &Upload) -> io::Result<String> {
        let relative = format!(
            "menus/{restaurant_id}/{}-{}.{}",
            upload.stem(),
            unique_suffix(),
            upload.extension()
        );
        self.write(relative, &upload.bytes).await
    }

    /// `restaurant/{restaurant}/{stem}-{unique}.{ext}`, for owner settings.
    pub async fn save_restaurant_photo(
        &self,
        restaurant_id: RestaurantId,
        upload: &Upload,
    ) -> io::Result<String> {
        let relative = format!(
            "restaurant/{restaurant_id}/{}-{}.{}",
            upload.stem(),
            unique_suffix(),
            upload.extension()
        );
        self.write(relative, &upload.bytes).await
    }

    /// `restaurants/{unique}.{ext}`, for logos and backgrounds set by admins.
    pub async fn save_admin_photo(&self, upload: &Upload) -> io::Result<String> {
        let relative = format!("restaurants/{}.{}", unique_suffix(), upload.extension());
        self.write(relative, &upload.bytes).await
    }

    async fn write(&self, relative: String, bytes: &[u8]) -> io::Result<String> {
        let target = self.root.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        debug!(path = %relative, size = bytes.len(), "Upload stored");
        Ok(relative)
    }

    /// Delete a stored file. Missing files and unsafe paths are ignored.
    pub async fn remove(&self, relative: &str) {
        if !is_safe_relative(relative) {
            warn!(path = relative, "Refusing to remove path outside uploads");
            return;
        }
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => debug!(path = relative, "Upload removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = relative, error = %e, "Failed to remove upload"),
        }
    }

    pub async fn remove_all(&self, paths: impl IntoIterator<Item = String>) {
        for path in paths {
            self.remove(&path).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, mime: &str) -> Upload {
        Upload {
            file_name: Some(name.to_string()),
            content_type: Some(mime.to_string()),
            bytes: Bytes::from_static(b"%PDF-1.4"),
        }
    }

    #[test]
    fn extension_prefers_mime() {
        assert_eq!(extension_for("application/pdf", Some("carte.txt")), "pdf");
        assert_eq!(extension_for("image/jpeg", None), "jpg");
        assert_eq!(extension_for("image/svg+xml", None), "svg");
        assert_eq!(extension_for("application/x-foo", Some("Menu.HEIC")), "heic");
        assert_eq!(extension_for("application/x-foo", Some("noext")), "bin");
        assert_eq!(extension_for("", None), "bin");
    }

    #[test]
    fn unsafe_paths_are_detected() {
        assert!(is_safe_relative("menus/a/b.pdf"));
        assert!(!is_safe_relative("../etc/passwd"));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative("menus/../../x"));
        assert!(!is_safe_relative(""));
    }

    #[tokio::test]
    async fn menu_lands_under_restaurant_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let rid = RestaurantId::new();

        let path = store
            .save_menu(rid, &upload("Carte du Jour.pdf", "application/pdf"))
            .await
            .unwrap();
        assert!(path.starts_with(&format!("menus/{rid}/carte-du-jour-")));
        assert!(path.ends_with(".pdf"));
        assert_eq!(std::fs::read(dir.path().join(&path)).unwrap(), b"%PDF-1.4");

        store.remove(&path).await;
        assert!(!dir.path().join(&path).exists());
        // second removal is a no-op
        store.remove(&path).await;
    }

    #[tokio::test]
    async fn photos_use_their_own_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let rid = RestaurantId::new();

        let owner = store
            .save_restaurant_photo(rid, &upload("logo.png", "image/png"))
            .await
            .unwrap();
        assert!(owner.starts_with(&format!("restaurant/{rid}/logo-")));

        let admin = store
            .save_admin_photo(&upload("fond.webp", "image/webp"))
            .await
            .unwrap();
        assert!(admin.starts_with("restaurants/"));
        assert!(admin.ends_with(".webp"));
    }
}
