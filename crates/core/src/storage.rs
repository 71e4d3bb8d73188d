//! Storage layout: job-id to directory mapping and path confinement.
//!
//! One directory per job under a fixed storage root, named by the job
//! id. Directory existence is the source of truth for job existence --
//! there is no separate index. [`sanitize_filename`] is the sole guard
//! against path traversal and must be applied to every user-supplied
//! filename before it touches the filesystem.

use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

/// Maps job identifiers to isolated directories under a fixed root.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The fixed storage root all job directories live under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage root if it does not exist yet.
    ///
    /// Called once at startup. A root that cannot be created is the one
    /// unrecoverable storage condition the service refuses to start
    /// without.
    pub async fn ensure_root(&self) -> CoreResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CoreError::Storage(format!("{}: {e}", self.root.display())))
    }

    /// Create the directory for a freshly issued job id.
    pub async fn create_job_dir(&self, id: &str) -> CoreResult<PathBuf> {
        let dir = self.root.join(id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CoreError::Storage(format!("{}: {e}", dir.display())))?;
        Ok(dir)
    }

    /// Look up the directory for `id`, returning `None` unless it
    /// exists and is a directory.
    ///
    /// The id itself is user input on the two-step and download paths,
    /// so it goes through the same sanitation as filenames.
    pub async fn job_dir(&self, id: &str) -> CoreResult<Option<PathBuf>> {
        let id = sanitize_filename(id)?;
        let dir = self.root.join(id);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(Some(dir)),
            _ => Ok(None),
        }
    }

    /// Join a sanitized filename onto a job directory.
    pub fn resolve_path(&self, dir: &Path, filename: &str) -> CoreResult<PathBuf> {
        let name = sanitize_filename(filename)?;
        Ok(dir.join(name))
    }

    /// Open a file inside a job directory for a download.
    ///
    /// Fails with [`CoreError::NotFound`] unless the resolved path
    /// exists and is a regular file.
    pub async fn open_for_read(&self, dir: &Path, filename: &str) -> CoreResult<tokio::fs::File> {
        let path = self.resolve_path(dir, filename)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(CoreError::NotFound(filename.to_string())),
        }
        tokio::fs::File::open(&path)
            .await
            .map_err(|_| CoreError::NotFound(filename.to_string()))
    }
}

/// Validate a user-supplied filename and return it as a plain segment.
///
/// Rejects anything that could escape the job directory: empty names,
/// path separators (either flavour), `.`/`..` segments, and NUL bytes.
pub fn sanitize_filename(name: &str) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::InvalidPath("empty filename".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(CoreError::InvalidPath(format!(
            "path separators not allowed: {name}"
        )));
    }
    if name == "." || name == ".." {
        return Err(CoreError::InvalidPath(format!(
            "directory segment not allowed: {name}"
        )));
    }
    if name.contains('\0') {
        return Err(CoreError::InvalidPath("NUL byte in filename".into()));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn sanitize_accepts_plain_names() {
        assert_eq!(sanitize_filename("clip.mp4").unwrap(), "clip.mp4");
        assert_eq!(sanitize_filename("  out.mkv ").unwrap(), "out.mkv");
    }

    #[test]
    fn sanitize_rejects_traversal() {
        assert_matches!(
            sanitize_filename("../etc/passwd"),
            Err(CoreError::InvalidPath(_))
        );
        assert_matches!(sanitize_filename(".."), Err(CoreError::InvalidPath(_)));
        assert_matches!(
            sanitize_filename("/etc/passwd"),
            Err(CoreError::InvalidPath(_))
        );
        assert_matches!(
            sanitize_filename("a\\b.mp4"),
            Err(CoreError::InvalidPath(_))
        );
        assert_matches!(sanitize_filename(""), Err(CoreError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn job_dir_requires_existing_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let layout = StorageLayout::new(tmp.path());

        assert!(layout.job_dir("nope").await.unwrap().is_none());

        let dir = layout.create_job_dir("abc123").await.unwrap();
        assert_eq!(layout.job_dir("abc123").await.unwrap(), Some(dir));
    }

    #[tokio::test]
    async fn job_dir_rejects_traversal_ids() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let layout = StorageLayout::new(tmp.path());
        assert_matches!(
            layout.job_dir("../outside").await,
            Err(CoreError::InvalidPath(_))
        );
    }

    #[tokio::test]
    async fn open_for_read_missing_file_is_not_found() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let layout = StorageLayout::new(tmp.path());
        let dir = layout.create_job_dir("job1").await.unwrap();

        assert_matches!(
            layout.open_for_read(&dir, "missing.mp4").await,
            Err(CoreError::NotFound(_))
        );

        tokio::fs::write(dir.join("out.mp4"), b"data").await.unwrap();
        assert!(layout.open_for_read(&dir, "out.mp4").await.is_ok());
    }
}
