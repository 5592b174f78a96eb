// Validates uploaded listing photos and places them in the static upload directory.

use chrono::Utc;
use rand::Rng;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_IMAGE_SIZE_BYTES: usize = 5 * 1024 * 1024; // 5 MiB
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];
pub const DEFAULT_ALLOWED_MIME_PREFIXES: &[&str] = &["image/"];

/// How stored files are named. The original extension is always preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FilenameStrategy {
    /// `<unix millis>-<random below 1e9>.<ext>`
    #[default]
    TimestampRandom,
    /// `<uuid v4>.<ext>`
    Uuid,
}

impl FilenameStrategy {
    fn generate(self, extension: &str) -> String {
        match self {
            FilenameStrategy::TimestampRandom => {
                let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
                format!("{}-{}.{}", Utc::now().timestamp_millis(), suffix, extension)
            }
            FilenameStrategy::Uuid => format!("{}.{}", Uuid::new_v4(), extension),
        }
    }
}

/// Everything the intake needs to accept and place a file.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    // Directory on disk; created on first store if missing.
    pub upload_dir: PathBuf,
    // URL prefix under which `upload_dir` is served.
    pub public_prefix: String,
    pub max_size_bytes: usize,
    // Lower-case, without the leading dot.
    pub allowed_extensions: Vec<String>,
    pub allowed_mime_prefixes: Vec<String>,
    pub filename_strategy: FilenameStrategy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            public_prefix: "/uploads".to_string(),
            max_size_bytes: DEFAULT_MAX_IMAGE_SIZE_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            allowed_mime_prefixes: DEFAULT_ALLOWED_MIME_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            filename_strategy: FilenameStrategy::default(),
        }
    }
}

/// A file that now lives in the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_name: String,
    // Path clients use to fetch the file, e.g. `/uploads/<file_name>`.
    pub public_path: String,
    pub fs_path: PathBuf,
}

#[derive(Debug)]
pub enum UploadError {
    InvalidType(String),
    TooLarge { size: usize, limit: usize },
    Empty,
    Io(std::io::Error),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::InvalidType(reason) => write!(f, "Only images are allowed: {}", reason),
            UploadError::TooLarge { size, limit } => write!(
                f,
                "Image is {} bytes, which exceeds the {} byte limit",
                size, limit
            ),
            UploadError::Empty => write!(f, "Uploaded image is empty"),
            UploadError::Io(e) => write!(f, "Failed to write image: {}", e),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        UploadError::Io(err)
    }
}

// Both the declared media type and the extension must look like an image;
// either one alone is trivially spoofed.
fn check_declared_type(
    config: &UploadConfig,
    declared_mime: Option<&str>,
    declared_filename: Option<&str>,
) -> Result<String, UploadError> {
    let media_type: mime::Mime = declared_mime
        .ok_or_else(|| UploadError::InvalidType("missing content type".to_string()))?
        .parse()
        .map_err(|_| {
            UploadError::InvalidType(format!(
                "unparseable content type '{}'",
                declared_mime.unwrap_or_default()
            ))
        })?;
    let essence = media_type.essence_str().to_ascii_lowercase();
    if !config
        .allowed_mime_prefixes
        .iter()
        .any(|prefix| essence.starts_with(prefix.as_str()))
    {
        return Err(UploadError::InvalidType(format!(
            "content type '{}' is not allowed",
            essence
        )));
    }

    let extension = declared_filename
        .map(Path::new)
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| UploadError::InvalidType("file name has no extension".to_string()))?;
    if !config.allowed_extensions.iter().any(|allowed| *allowed == extension) {
        return Err(UploadError::InvalidType(format!(
            "extension '.{}' is not allowed",
            extension
        )));
    }

    Ok(extension)
}

/// Checks an uploaded payload against `config` without touching the filesystem.
/// Returns the normalized extension the stored file will carry.
pub fn validate_image(
    config: &UploadConfig,
    bytes: &[u8],
    declared_mime: Option<&str>,
    declared_filename: Option<&str>,
) -> Result<String, UploadError> {
    // Size first, so an oversized payload is refused whatever it claims to be
    if bytes.len() > config.max_size_bytes {
        return Err(UploadError::TooLarge {
            size: bytes.len(),
            limit: config.max_size_bytes,
        });
    }
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    check_declared_type(config, declared_mime, declared_filename)
}

// Attempts at finding a free file name before giving up.
const MAX_NAME_ATTEMPTS: usize = 8;

// Claims a file name by creating an empty file with `create_new`, so an existing
// image is never replaced even if two generated names collide.
async fn reserve_file_name(
    dir: &Path,
    mut next_name: impl FnMut() -> String,
) -> std::io::Result<(String, PathBuf)> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let file_name = next_name();
        let fs_path = dir.join(&file_name);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&fs_path)
            .await
        {
            Ok(_) => return Ok((file_name, fs_path)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                warn!("Image name {} is taken, generating another", file_name);
            }
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("no free image name after {} attempts", MAX_NAME_ATTEMPTS),
    ))
}

// Writes into a `.part` sibling and renames it over the reserved name. On failure
// both the `.part` file and the reservation are removed.
async fn write_reserved(
    config: &UploadConfig,
    file_name: String,
    fs_path: PathBuf,
    bytes: &[u8],
) -> Result<StoredImage, UploadError> {
    let part_path = config.upload_dir.join(format!("{}.part", file_name));

    let write_result = async {
        tokio::fs::write(&part_path, bytes).await?;
        tokio::fs::rename(&part_path, &fs_path).await
    }
    .await;

    if let Err(e) = write_result {
        error!("Failed to store image {}: {}", fs_path.display(), e);
        let _ = tokio::fs::remove_file(&part_path).await;
        let _ = tokio::fs::remove_file(&fs_path).await;
        return Err(UploadError::Io(e));
    }

    info!("Stored image {} ({} bytes)", fs_path.display(), bytes.len());

    Ok(StoredImage {
        public_path: format!(
            "{}/{}",
            config.public_prefix.trim_end_matches('/'),
            file_name
        ),
        file_name,
        fs_path,
    })
}

/// Validates an image and writes it into the upload directory.
///
/// Rejections happen before any I/O. The write goes to a `.part` file that is
/// renamed into place, so a failed write never leaves a half-written image behind.
pub async fn store_image(
    config: &UploadConfig,
    bytes: &[u8],
    declared_mime: Option<&str>,
    declared_filename: Option<&str>,
) -> Result<StoredImage, UploadError> {
    let extension = validate_image(config, bytes, declared_mime, declared_filename)?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let (file_name, fs_path) = reserve_file_name(&config.upload_dir, || {
        config.filename_strategy.generate(&extension)
    })
    .await?;

    write_reserved(config, file_name, fs_path, bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok, block_on};

    const MIB: usize = 1024 * 1024;

    fn config_in(dir: &Path) -> UploadConfig {
        UploadConfig {
            upload_dir: dir.join("uploads"),
            ..Default::default()
        }
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[test]
    fn test_png_under_limit_is_stored() {
        let temp = tempfile::tempdir().unwrap();
        let config = config_in(temp.path());
        let bytes = vec![0x89u8; 4 * MIB];

        let stored = assert_ok!(block_on(store_image(
            &config,
            &bytes,
            Some("image/png"),
            Some("photo.png"),
        )));

        assert!(stored.file_name.ends_with(".png"));
        assert_eq!(stored.public_path, format!("/uploads/{}", stored.file_name));
        assert_eq!(std::fs::read(&stored.fs_path).unwrap().len(), 4 * MIB);
        assert_eq!(file_count(&config.upload_dir), 1);
    }

    #[test]
    fn test_limit_is_inclusive() {
        let config = UploadConfig::default();
        let bytes = vec![1u8; DEFAULT_MAX_IMAGE_SIZE_BYTES];
        assert_ok!(validate_image(&config, &bytes, Some("image/jpeg"), Some("a.jpg")));
    }

    #[test]
    fn test_oversized_payload_is_rejected_regardless_of_type() {
        let temp = tempfile::tempdir().unwrap();
        let config = config_in(temp.path());
        let bytes = vec![0u8; 6 * MIB];

        for (mime, name) in [
            (Some("image/png"), Some("photo.png")),
            (Some("application/x-msdownload"), Some("photo.exe")),
        ] {
            let err = assert_err!(block_on(store_image(&config, &bytes, mime, name)));
            assert!(matches!(
                err,
                UploadError::TooLarge { size, limit } if size == 6 * MIB && limit == 5 * MIB
            ));
        }
        assert_eq!(file_count(&config.upload_dir), 0);
    }

    #[test]
    fn test_image_mime_with_wrong_extension_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let config = config_in(temp.path());

        let err = assert_err!(block_on(store_image(
            &config,
            b"MZ",
            Some("image/png"),
            Some("photo.exe"),
        )));
        assert!(matches!(err, UploadError::InvalidType(_)));
        assert!(!config.upload_dir.exists());
    }

    #[test]
    fn test_image_extension_with_non_image_mime_is_rejected() {
        let config = UploadConfig::default();
        let err = assert_err!(validate_image(
            &config,
            b"data",
            Some("text/plain"),
            Some("photo.png"),
        ));
        assert!(matches!(err, UploadError::InvalidType(_)));
    }

    #[test]
    fn test_missing_declarations_are_rejected() {
        let config = UploadConfig::default();
        assert!(matches!(
            validate_image(&config, b"data", None, Some("photo.png")),
            Err(UploadError::InvalidType(_))
        ));
        assert!(matches!(
            validate_image(&config, b"data", Some("image/png"), None),
            Err(UploadError::InvalidType(_))
        ));
        assert!(matches!(
            validate_image(&config, b"data", Some("image/png"), Some("photo")),
            Err(UploadError::InvalidType(_))
        ));
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        let config = UploadConfig::default();
        assert!(matches!(
            validate_image(&config, b"", Some("image/png"), Some("photo.png")),
            Err(UploadError::Empty)
        ));
    }

    #[test]
    fn test_extension_and_mime_are_case_insensitive() {
        let config = UploadConfig::default();
        let extension = assert_ok!(validate_image(
            &config,
            b"data",
            Some("IMAGE/JPEG; charset=binary"),
            Some("Holiday.JPG"),
        ));
        assert_eq!(extension, "jpg");
    }

    #[test]
    fn test_uuid_strategy_names_files_uniquely() {
        let temp = tempfile::tempdir().unwrap();
        let config = UploadConfig {
            filename_strategy: FilenameStrategy::Uuid,
            ..config_in(temp.path())
        };

        let first = assert_ok!(block_on(store_image(
            &config,
            b"gif",
            Some("image/gif"),
            Some("a.gif"),
        )));
        let second = assert_ok!(block_on(store_image(
            &config,
            b"gif",
            Some("image/gif"),
            Some("a.gif"),
        )));

        assert_ne!(first.file_name, second.file_name);
        assert!(Uuid::parse_str(first.file_name.trim_end_matches(".gif")).is_ok());
        assert_eq!(file_count(&config.upload_dir), 2);
    }

    #[test]
    fn test_colliding_name_is_not_overwritten() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        std::fs::write(dir.join("taken.png"), b"first listing").unwrap();

        let mut names = vec!["free.png", "taken.png"];
        let (file_name, fs_path) = assert_ok!(block_on(reserve_file_name(dir, || {
            names.pop().unwrap().to_string()
        })));

        assert_eq!(file_name, "free.png");
        assert_eq!(fs_path, dir.join("free.png"));
        assert_eq!(std::fs::read(dir.join("taken.png")).unwrap(), b"first listing");
    }

    #[test]
    fn test_reservation_gives_up_when_every_name_is_taken() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("taken.png"), b"x").unwrap();

        let err = assert_err!(block_on(reserve_file_name(temp.path(), || {
            "taken.png".to_string()
        })));
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_failed_write_leaves_no_partial_file() {
        let temp = tempfile::tempdir().unwrap();
        let config = config_in(temp.path());
        std::fs::create_dir_all(&config.upload_dir).unwrap();

        // A non-empty directory where the image should land makes the rename fail
        let fs_path = config.upload_dir.join("blocked.png");
        std::fs::create_dir(&fs_path).unwrap();
        std::fs::write(fs_path.join("occupant"), b"x").unwrap();

        let err = assert_err!(block_on(write_reserved(
            &config,
            "blocked.png".to_string(),
            fs_path,
            b"png bytes",
        )));
        assert!(matches!(err, UploadError::Io(_)));

        let leftovers: Vec<_> = std::fs::read_dir(&config.upload_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty(), "partial files left: {:?}", leftovers);
    }

    #[test]
    fn test_store_image_reports_io_failure() {
        let temp = tempfile::tempdir().unwrap();
        // The upload directory path is occupied by a regular file
        let blocker = temp.path().join("uploads");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let config = config_in(temp.path());

        let err = assert_err!(block_on(store_image(
            &config,
            b"png bytes",
            Some("image/png"),
            Some("photo.png"),
        )));
        assert!(matches!(err, UploadError::Io(_)));
        assert_eq!(std::fs::read(&blocker).unwrap(), b"not a directory");
    }

    #[test]
    fn test_timestamp_random_name_shape() {
        let name = FilenameStrategy::TimestampRandom.generate("webp");
        let stem = name.strip_suffix(".webp").unwrap();
        let (millis, random) = stem.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert!(random.parse::<u32>().unwrap() < 1_000_000_000);
    }
}
