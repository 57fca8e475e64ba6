//! Cover image download
//!
//! Images land in `{data_dir}/{slug}/images/{slug}_{random8}.png`. The name
//! carries no relation to the book; it only has to be unique inside the
//! category's image directory.

use crate::crawler::Fetcher;
use crate::output::csv_output::category_dir;
use crate::{CrawlError, PersistenceError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

const SUFFIX_LEN: usize = 8;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const NAME_ATTEMPTS: usize = 5;

/// Where one category's images are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTarget {
    pub dir: PathBuf,
    pub prefix: String,
}

impl ImageTarget {
    pub fn for_category(data_dir: &Path, slug: &str) -> Self {
        Self {
            dir: category_dir(data_dir, slug).join("images"),
            prefix: slug.to_string(),
        }
    }

    /// A fresh candidate file name
    pub fn file_name(&self) -> String {
        format!("{}_{}.png", self.prefix, random_suffix())
    }
}

/// Eight random characters from `[a-z0-9]`
pub fn random_suffix() -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[fastrand::usize(..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Downloads `url` into the target directory
///
/// The file is created with `create_new`, so an existing image is never
/// overwritten; a name collision draws a new suffix.
///
/// # Errors
///
/// - `CrawlError::Fetch` if the image cannot be downloaded
/// - `CrawlError::Persistence` if the directory or file cannot be written
pub async fn save_image(
    fetcher: &dyn Fetcher,
    url: &Url,
    target: &ImageTarget,
) -> Result<PathBuf, CrawlError> {
    let bytes = fetcher.fetch_bytes(url).await?;

    tokio::fs::create_dir_all(&target.dir)
        .await
        .map_err(|e| PersistenceError::io(&target.dir, e))?;

    let mut last_error = None;
    for _ in 0..NAME_ATTEMPTS {
        let path = target.dir.join(target.file_name());
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;

        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                last_error = Some(PersistenceError::io(&path, e));
                continue;
            }
            Err(e) => return Err(PersistenceError::io(&path, e).into()),
        };

        file.write_all(&bytes)
            .await
            .map_err(|e| PersistenceError::io(&path, e))?;
        file.flush()
            .await
            .map_err(|e| PersistenceError::io(&path, e))?;

        tracing::debug!("Saved image {} to {}", url, path.display());
        return Ok(path);
    }

    Err(last_error
        .unwrap_or_else(|| {
            PersistenceError::io(
                &target.dir,
                std::io::Error::new(ErrorKind::AlreadyExists, "no free image name"),
            )
        })
        .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FetchCause, FetchError};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct StaticImage(Option<Vec<u8>>);

    #[async_trait]
    impl Fetcher for StaticImage {
        async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
            self.0
                .clone()
                .ok_or_else(|| FetchError::new(url.as_str(), FetchCause::Status(404)))
        }
    }

    fn image_url() -> Url {
        Url::parse("http://books.toscrape.com/media/cache/6d/41/6d41.jpg").unwrap()
    }

    #[test]
    fn test_random_suffix_shape() {
        for _ in 0..50 {
            let suffix = random_suffix();
            assert_eq!(suffix.len(), 8);
            assert!(suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_target_layout() {
        let target = ImageTarget::for_category(Path::new("data"), "travel_2");
        assert_eq!(target.dir, PathBuf::from("data/travel_2/images"));

        let name = target.file_name();
        assert!(name.starts_with("travel_2_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "travel_2_".len() + 8 + ".png".len());
    }

    #[tokio::test]
    async fn test_save_image_writes_bytes() {
        let tmp = TempDir::new().unwrap();
        let target = ImageTarget::for_category(tmp.path(), "travel_2");
        let fetcher = StaticImage(Some(vec![0x89, b'P', b'N', b'G']));

        let first = save_image(&fetcher, &image_url(), &target).await.unwrap();
        let second = save_image(&fetcher, &image_url(), &target).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), vec![0x89, b'P', b'N', b'G']);
        assert_eq!(std::fs::read_dir(&target.dir).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_failed_download_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let target = ImageTarget::for_category(tmp.path(), "travel_2");

        let err = save_image(&StaticImage(None), &image_url(), &target)
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::Fetch(_)));
        assert!(!target.dir.exists());
    }
}
