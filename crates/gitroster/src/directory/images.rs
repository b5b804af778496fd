use std::path::PathBuf;

use async_trait::async_trait;

use super::{DirectoryError, ImageStore, Result};
use crate::github::is_valid_login;

const AVATAR_DIR: &str = "avatars";

/// Guess a file extension from the image's magic bytes.
fn image_extension(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "png",
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [b'G', b'I', b'F', b'8', ..] => "gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        _ => "img",
    }
}

/// Stores avatars as `<root>/avatars/<login>.<ext>`.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn store_avatar(&self, login: &str, bytes: &[u8]) -> Result<String> {
        // Logins become file names, so anything else is refused.
        if !is_valid_login(login) {
            return Err(DirectoryError::invalid_input(format!(
                "not a GitHub login: {login}"
            )));
        }
        if bytes.is_empty() {
            return Err(DirectoryError::invalid_input("empty avatar"));
        }

        let dir = self.root.join(AVATAR_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", login.to_ascii_lowercase(), image_extension(bytes));
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        tracing::debug!(login, file = %file_name, size = bytes.len(), "Stored avatar");
        Ok(format!("{AVATAR_DIR}/{file_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(&[0x89, b'P', b'N', b'G', 0x0D]), "png");
        assert_eq!(image_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(image_extension(b"GIF89a"), "gif");
        assert_eq!(image_extension(b"RIFF\0\0\0\0WEBPVP8 "), "webp");
        assert_eq!(image_extension(b"??"), "img");
    }

    #[tokio::test]
    async fn stores_avatar_under_root() {
        let root = std::env::temp_dir().join(format!("gitroster-images-{}", uuid::Uuid::new_v4()));
        let store = FsImageStore::new(&root);

        let path = store
            .store_avatar("Octocat", &[0x89, b'P', b'N', b'G'])
            .await
            .expect("store");
        assert_eq!(path, "avatars/octocat.png");

        let written = tokio::fs::read(root.join(&path)).await.expect("read back");
        assert_eq!(written, vec![0x89, b'P', b'N', b'G']);

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn refuses_path_like_logins() {
        let store = FsImageStore::new(std::env::temp_dir());
        let err = store
            .store_avatar("../etc", b"x")
            .await
            .expect_err("should refuse");
        assert!(matches!(err, DirectoryError::InvalidInput { .. }));
    }
}
