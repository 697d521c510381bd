//! Backup copies of documents, taken just before a document is replaced or deleted.

use crate::error::Res;
use crate::{utils, Config};
use anyhow::Context;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Manages backup file creation and rotation.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    /// Creates a new `Backup` instance from a `Config`.
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
        }
    }

    /// Copies `document` into the backups directory as `{file name}.YYYY-MM-DD-NNN`, where NNN is
    /// a sequence number. Old copies of the same document are rotated so that only
    /// `backup_copies` remain. Does nothing and returns `None` if the document does not exist yet
    /// or if `backup_copies` is zero.
    pub async fn copy_document(&self, document: &Path) -> Res<Option<PathBuf>> {
        if self.backup_copies == 0 || !document.is_file() {
            return Ok(None);
        }
        let prefix = document
            .file_name()
            .with_context(|| format!("'{}' has no file name", document.display()))?
            .to_string_lossy()
            .to_string();
        let date = today();
        let seq = self.next_sequence_number(&prefix, &date).await?;
        let path = self.backups_dir.join(format!("{prefix}.{date}-{seq:03}"));

        utils::copy(document, &path).await?;
        debug!("Saved backup of {} to {}", document.display(), path.display());

        self.rotate(&prefix).await?;
        Ok(Some(path))
    }

    /// Scans the backups directory for existing files with the given prefix and date,
    /// and returns the next sequence number.
    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Res<u32> {
        let mut max_seq: u32 = 0;
        for name in self.file_names().await? {
            if let Some(seq) = parse_sequence_number(&name, prefix, date) {
                max_seq = max_seq.max(seq);
            }
        }
        Ok(max_seq + 1)
    }

    /// Rotates old backup files, keeping only `backup_copies` files with the given prefix.
    async fn rotate(&self, prefix: &str) -> Res<()> {
        let mut files: Vec<String> = self
            .file_names()
            .await?
            .into_iter()
            .filter(|name| is_backup_of(name, prefix))
            .collect();

        // The name format makes lexical order the same as chronological order.
        files.sort();

        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for name in files.into_iter().take(to_delete) {
            utils::remove(&self.backups_dir.join(name)).await?;
        }
        Ok(())
    }

    async fn file_names(&self) -> Res<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }
}

/// Returns today's date in YYYY-MM-DD format.
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses the sequence number from a backup filename like `{prefix}.{date}-{NNN}`.
/// Returns None if the filename doesn't match the expected pattern.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    filename
        .strip_prefix(prefix)?
        .strip_prefix('.')?
        .strip_prefix(date)?
        .strip_prefix('-')?
        .parse()
        .ok()
}

/// Checks if a filename is a backup of the document named `prefix`.
fn is_backup_of(filename: &str, prefix: &str) -> bool {
    let Some(rest) = filename
        .strip_prefix(prefix)
        .and_then(|r| r.strip_prefix('.'))
    else {
        return false;
    };
    // rest is `YYYY-MM-DD-NNN`
    match rest.rsplit_once('-') {
        Some((date, seq)) => date.len() == 10 && seq.parse::<u32>().is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number(
                "project_A.xlsx.2025-12-14-001",
                "project_A.xlsx",
                "2025-12-14"
            ),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("summary.xlsx.2025-12-14-042", "summary.xlsx", "2025-12-14"),
            Some(42)
        );
        // Wrong prefix
        assert_eq!(
            parse_sequence_number(
                "project_B.xlsx.2025-12-14-001",
                "project_A.xlsx",
                "2025-12-14"
            ),
            None
        );
        // Wrong date
        assert_eq!(
            parse_sequence_number("summary.xlsx.2025-12-13-001", "summary.xlsx", "2025-12-14"),
            None
        );
    }

    #[test]
    fn test_is_backup_of() {
        assert!(is_backup_of("summary.xlsx.2025-12-14-001", "summary.xlsx"));
        assert!(!is_backup_of("summary.xlsx.2025-12-14-001", "project_A.xlsx"));
        // A project whose name extends another's must not be rotated with it.
        assert!(!is_backup_of("project_A_B.xlsx.2025-12-14-001", "project_A"));
        assert!(!is_backup_of("summary.xlsx", "summary.xlsx"));
    }

    #[tokio::test]
    async fn test_copy_document_rotates() {
        let dir = TempDir::new().unwrap();
        let backups_dir = dir.path().join(".backups");
        std::fs::create_dir_all(&backups_dir).unwrap();
        let doc = dir.path().join("summary.xlsx");
        std::fs::write(&doc, "v1").unwrap();

        let backup = Backup {
            backups_dir: backups_dir.clone(),
            backup_copies: 2,
        };
        for _ in 0..4 {
            assert!(backup.copy_document(&doc).await.unwrap().is_some());
        }
        let mut names: Vec<String> = std::fs::read_dir(&backups_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("-003"));
        assert!(names[1].ends_with("-004"));
    }

    #[tokio::test]
    async fn test_copy_missing_document_is_noop() {
        let dir = TempDir::new().unwrap();
        let backup = Backup {
            backups_dir: dir.path().to_path_buf(),
            backup_copies: 5,
        };
        let result = backup
            .copy_document(&dir.path().join("missing.xlsx"))
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
