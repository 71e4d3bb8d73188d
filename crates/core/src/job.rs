//! Job identity and input binding.
//!
//! A job is an opaque server-generated id plus a directory under the
//! storage root. The registry keeps no in-memory state: resolving a job
//! re-derives everything from the filesystem, which makes job existence
//! equal directory existence.

use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::storage::{sanitize_filename, StorageLayout};

/// Prefix the uploaded input file is stored under inside a job
/// directory. Outputs never use this prefix, so a directory scan can
/// always tell the input apart from produced artifacts.
const INPUT_STEM: &str = "input";

/// Fallback extension when the uploaded filename carries none.
const DEFAULT_EXT: &str = ".mp4";

/// An isolated unit of work: one input file and its derived outputs.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub dir: PathBuf,
    /// Set once by [`JobRegistry::bind_input`]; immutable afterwards.
    pub input_path: Option<PathBuf>,
}

impl Job {
    /// Name of the bound input file, if any.
    pub fn input_name(&self) -> Option<String> {
        self.input_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Issues job identities and binds uploaded inputs to them.
#[derive(Debug, Clone)]
pub struct JobRegistry {
    storage: StorageLayout,
}

impl JobRegistry {
    pub fn new(storage: StorageLayout) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &StorageLayout {
        &self.storage
    }

    /// Create a fresh job with a random id and an empty directory.
    ///
    /// Ids are uuid-v4 rendered without hyphens, so collisions are
    /// cryptographically negligible and the id doubles as a safe
    /// directory name.
    pub async fn create_job(&self) -> CoreResult<Job> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let dir = self.storage.create_job_dir(&id).await?;
        tracing::debug!(job_id = %id, dir = %dir.display(), "created job directory");
        Ok(Job {
            id,
            dir,
            input_path: None,
        })
    }

    /// Look up a previously created job by id.
    ///
    /// The input file, if one was bound, is rediscovered by scanning
    /// the directory for the `input*` file.
    pub async fn resolve_job(&self, id: &str) -> CoreResult<Job> {
        let dir = self
            .storage
            .job_dir(id)
            .await?
            .ok_or_else(|| CoreError::JobNotFound(id.to_string()))?;
        let input_path = find_input_file(&dir).await;
        Ok(Job {
            id: id.trim().to_string(),
            dir,
            input_path,
        })
    }

    /// Write the uploaded bytes into the job directory and record the
    /// input path.
    ///
    /// The file is stored as `input<ext>`, taking the extension from
    /// the (sanitized) original filename. Binding a second input to the
    /// same job is rejected so repeat `/process` calls always see one
    /// immutable input.
    pub async fn bind_input(
        &self,
        job: &mut Job,
        original_filename: &str,
        bytes: &[u8],
    ) -> CoreResult<PathBuf> {
        if job.input_path.is_some() || find_input_file(&job.dir).await.is_some() {
            return Err(CoreError::JobAlreadyBound(job.id.clone()));
        }
        if bytes.is_empty() {
            return Err(CoreError::Upload("empty upload".into()));
        }

        let original = sanitize_filename(original_filename)
            .map_err(|e| CoreError::Upload(e.to_string()))?;
        let ext = Path::new(&original)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| DEFAULT_EXT.to_string());

        let input_path = job.dir.join(format!("{INPUT_STEM}{ext}"));
        tokio::fs::write(&input_path, bytes)
            .await
            .map_err(|e| CoreError::Upload(format!("write failed: {e}")))?;

        tracing::debug!(
            job_id = %job.id,
            input = %input_path.display(),
            size = bytes.len(),
            "bound input file"
        );
        job.input_path = Some(input_path.clone());
        Ok(input_path)
    }
}

/// Find the `input*` file inside a job directory.
async fn find_input_file(dir: &Path) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(INPUT_STEM) {
            if let Ok(meta) = entry.metadata().await {
                if meta.is_file() {
                    return Some(entry.path());
                }
            }
        }
    }
    None
}
