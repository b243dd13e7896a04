//! # Working Directories
//!
//! Local checkouts live under `{base}/{namespace}/{codebase}/...`. Absence of a
//! directory is never an error, neither when cloning nor when cleaning up.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `{base}/{namespace}/{codebase}/{branch}`
#[must_use]
pub fn branch_work_dir(base: &Path, namespace: &str, codebase: &str, branch: &str) -> PathBuf {
    base.join(namespace).join(codebase).join(branch)
}

/// `{base}/{namespace}/{codebase}/templates/{codebase}`
#[must_use]
pub fn codebase_templates_dir(base: &Path, namespace: &str, codebase: &str) -> PathBuf {
    base.join(namespace)
        .join(codebase)
        .join("templates")
        .join(codebase)
}

/// Remove a directory tree, returning whether anything was removed
pub async fn remove_dir_if_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Directory removed");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Whether `path` is a directory with at least one entry
pub async fn is_populated(path: &Path) -> io::Result<bool> {
    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    Ok(entries.next_entry().await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_dir_layout() {
        let dir = branch_work_dir(Path::new("/home/codebase-operator/edp"), "edp", "app", "master");
        assert_eq!(dir, PathBuf::from("/home/codebase-operator/edp/edp/app/master"));
    }

    #[test]
    fn test_templates_dir_layout() {
        let dir = codebase_templates_dir(Path::new("/work"), "edp", "app");
        assert_eq!(dir, PathBuf::from("/work/edp/app/templates/app"));
    }

    #[tokio::test]
    async fn test_removing_missing_directory_is_noop() {
        let base = tempfile::tempdir().unwrap();
        let removed = remove_dir_if_exists(&base.path().join("missing")).await.unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_remove_existing_tree() {
        let base = tempfile::tempdir().unwrap();
        let dir = branch_work_dir(base.path(), "edp", "app", "master");
        std::fs::create_dir_all(dir.join(".git")).unwrap();

        assert!(remove_dir_if_exists(&dir).await.unwrap());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_populated_only_with_entries() {
        let base = tempfile::tempdir().unwrap();
        let dir = base.path().join("checkout");
        assert!(!is_populated(&dir).await.unwrap());

        std::fs::create_dir_all(&dir).unwrap();
        assert!(!is_populated(&dir).await.unwrap());

        std::fs::write(dir.join("README.md"), "app").unwrap();
        assert!(is_populated(&dir).await.unwrap());
    }
}
