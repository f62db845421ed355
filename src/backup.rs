//! Timestamped copies of a store file, taken before the first mutation of a run.
//!
//! Snapshots are never pruned.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;
use tokio::fs;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupSnapshot {
    pub source: PathBuf,
    pub path: PathBuf,
}

impl BackupSnapshot {
    /// `<file name>_backup_<YYYY-MM-DD_HHMMSS>`, e.g. `credentials_backup_2024-05-01_093000`.
    pub fn file_name(source: &Path, at: DateTime<Local>) -> String {
        let stem = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credentials".to_string());
        format!("{stem}_backup_{}", at.format("%Y-%m-%d_%H%M%S"))
    }

    /// Copies `source` byte for byte into `backup_dir`, creating the directory if needed.
    pub async fn create(source: &Path, backup_dir: &Path) -> Result<Self> {
        Self::create_at(source, backup_dir, Local::now()).await
    }

    pub async fn create_at(source: &Path, backup_dir: &Path, at: DateTime<Local>) -> Result<Self> {
        let io_err = |source| Error::BackupIo {
            path: backup_dir.to_path_buf(),
            source,
        };

        if !backup_dir.exists() {
            info!(
                "Credentials backup directory does not exist, creating {}",
                backup_dir.display()
            );
            fs::create_dir_all(backup_dir).await.map_err(io_err)?;
        }

        let path = backup_dir.join(Self::file_name(source, at));
        fs::copy(source, &path).await.map_err(|source_err| Error::BackupIo {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        info!("Backed up {} to {}", source.display(), path.display());

        Ok(Self {
            source: source.to_path_buf(),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_file_name() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 7).unwrap();
        assert_eq!(
            BackupSnapshot::file_name(Path::new("/home/a/.aws/credentials"), at),
            "credentials_backup_2024-05-01_093007"
        );
        assert_eq!(
            BackupSnapshot::file_name(Path::new("/home/a/.aws/temp_creds"), at),
            "temp_creds_backup_2024-05-01_093007"
        );
    }

    #[tokio::test]
    async fn test_create_copies_bytes_and_directory() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("credentials");
        let content = b"[work]\naws_access_key_id = AKIA\r\n; comment kept\n";
        std::fs::write(&source, content).unwrap();
        let backup_dir = dir.path().join("credentials_backup");

        let snapshot = BackupSnapshot::create(&source, &backup_dir).await.unwrap();
        assert!(snapshot.path.starts_with(&backup_dir));
        assert_eq!(std::fs::read(&snapshot.path).unwrap(), content);
    }

    #[tokio::test]
    async fn test_create_missing_source_is_backup_error() {
        let dir = TempDir::new().unwrap();
        let result =
            BackupSnapshot::create(&dir.path().join("credentials"), &dir.path().join("b")).await;
        assert!(matches!(result, Err(Error::BackupIo { .. })));
    }
}
