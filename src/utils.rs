use crate::error::{FileInUse, Res};
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// Windows reports a file held open by another process with these raw OS codes
/// (`ERROR_SHARING_VIOLATION`, `ERROR_LOCK_VIOLATION`).
const SHARING_VIOLATION: i32 = 32;
const LOCK_VIOLATION: i32 = 33;

/// Write a file.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Res<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .context(format!("Unable to write to {}", path.to_string_lossy()))
}

/// Read a file to a `String`.
pub(crate) async fn read(path: &Path) -> Res<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Read a file to bytes.
pub(crate) async fn read_bytes(path: &Path) -> Res<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Deserialize a JSON file into type `T`.
pub(crate) async fn deserialize<T>(path: &Path) -> Res<T>
where
    T: DeserializeOwned,
{
    let content = read(path).await?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file at {}", path.display()))
}

pub(crate) async fn make_dir(p: &Path) -> Res<()> {
    tokio::fs::create_dir_all(p)
        .await
        .with_context(|| format!("Unable to create directory at {}", p.to_string_lossy()))
}

pub(crate) async fn canonicalize(p: &Path) -> Res<PathBuf> {
    tokio::fs::canonicalize(p)
        .await
        .with_context(|| format!("Unable to canonicalize the path {}", p.to_string_lossy()))
}

pub(crate) async fn read_dir(p: &Path) -> Res<tokio::fs::ReadDir> {
    tokio::fs::read_dir(p)
        .await
        .with_context(|| format!("Unable to read directory {}", p.to_string_lossy()))
}

pub(crate) async fn copy(from: &Path, to: &Path) -> Res<()> {
    tokio::fs::copy(from, to).await.with_context(|| {
        format!(
            "Unable to copy file from '{}' to '{}'",
            from.to_string_lossy(),
            to.to_string_lossy()
        )
    })?;
    Ok(())
}

/// Deletes a file. A file that is locked by another program yields a `FileInUse` error.
pub(crate) async fn remove(path: &Path) -> Res<()> {
    tokio::fs::remove_file(path).await.map_err(|e| {
        if is_in_use(&e) {
            anyhow::Error::new(FileInUse::new(path))
        } else {
            anyhow::Error::new(e).context(format!("Unable to remove {}", path.display()))
        }
    })
}

/// Replaces the file at `path` with `contents` without ever leaving a half-written target behind.
///
/// The bytes are written to a uniquely named sibling file which is then renamed over the target.
/// When either step fails because the target (or its directory) is locked or not writable, the
/// error is a `FileInUse`. The temporary file is removed on failure.
pub(crate) async fn replace(path: &Path, contents: &[u8]) -> Res<()> {
    let tmp = temp_sibling(path);
    trace!("Writing {} bytes to {}", contents.len(), tmp.display());
    let result = match tokio::fs::write(&tmp, contents).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    settle_replace(path, &tmp, result).await
}

/// Maps the outcome of writing and renaming `tmp` to the outcome of replacing `path`. On failure
/// `tmp` is removed and `path` is left as it was.
async fn settle_replace(path: &Path, tmp: &Path, result: std::io::Result<()>) -> Res<()> {
    let Err(e) = result else {
        return Ok(());
    };
    if tmp.exists() {
        if let Err(cleanup) = tokio::fs::remove_file(tmp).await {
            warn!("Unable to remove temporary file {}: {cleanup}", tmp.display());
        }
    }
    if is_in_use(&e) {
        Err(anyhow::Error::new(FileInUse::new(path)))
    } else {
        Err(anyhow::Error::new(e).context(format!("Unable to write {}", path.display())))
    }
}

/// True when an I/O error means "someone else has this file" rather than a generic failure.
pub(crate) fn is_in_use(e: &std::io::Error) -> bool {
    if e.kind() == ErrorKind::PermissionDenied {
        return true;
    }
    matches!(e.raw_os_error(), Some(SHARING_VIOLATION) | Some(LOCK_VIOLATION))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_name = format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple());
    path.with_file_name(tmp_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_in_use() {
        let denied = std::io::Error::new(ErrorKind::PermissionDenied, "nope");
        assert!(is_in_use(&denied));
        let sharing = std::io::Error::from_raw_os_error(SHARING_VIOLATION);
        assert!(is_in_use(&sharing));
        let missing = std::io::Error::new(ErrorKind::NotFound, "gone");
        assert!(!is_in_use(&missing));
    }

    #[tokio::test]
    async fn test_replace_overwrites_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.xlsx");
        replace(&path, b"first").await.unwrap();
        replace(&path, b"second").await.unwrap();
        assert_eq!(read(&path).await.unwrap(), "second");
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["doc.xlsx".to_string()]);
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_locked_target_is_in_use_and_left_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.xlsx");
        replace(&path, b"previous").await.unwrap();

        // The new bytes were written but the rename was refused.
        let tmp = temp_sibling(&path);
        std::fs::write(&tmp, b"next").unwrap();
        let locked = std::io::Error::from_raw_os_error(SHARING_VIOLATION);
        let err = settle_replace(&path, &tmp, Err(locked)).await.unwrap_err();

        let in_use = err.downcast_ref::<FileInUse>().unwrap();
        assert_eq!(in_use.path(), path.as_path());
        assert_eq!(read(&path).await.unwrap(), "previous");
        assert_eq!(file_names(dir.path()), vec!["doc.xlsx".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_rename_keeps_the_target_and_removes_the_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let path = dir.path().join("doc.xlsx");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep.txt"), "kept").unwrap();

        let err = replace(&path, b"data").await.unwrap_err();
        assert!(!err.chain().any(|c| c.is::<FileInUse>()));
        assert_eq!(read(&path.join("keep.txt")).await.unwrap(), "kept");
        assert_eq!(file_names(dir.path()), vec!["doc.xlsx".to_string()]);
    }

    #[tokio::test]
    async fn test_replace_into_missing_directory_is_io_not_in_use() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("doc.xlsx");
        let err = replace(&path, b"data").await.unwrap_err();
        assert!(!err.chain().any(|c| c.is::<FileInUse>()));
    }
}
