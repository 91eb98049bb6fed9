//! Writing resolved papers to disk.

use std::path::{Path, PathBuf};

use crate::models::RetrievedArtifact;
use crate::utils::hashed_filename;

/// Name used when nothing better is available
pub const FALLBACK_FILENAME: &str = "paper.pdf";

/// Errors that can occur while saving
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The artifact is a failure and has nothing to write
    #[error("Nothing to save for {url}: {reason}")]
    NoContent { url: String, reason: String },

    #[error("Failed to save PDF: {0}")]
    Io(#[from] std::io::Error),
}

/// Pick the file name for an artifact.
///
/// The suggested name wins; otherwise a content-addressed name is derived
/// from the source URL and bytes; [`FALLBACK_FILENAME`] is the last resort.
pub fn filename_for(artifact: &RetrievedArtifact) -> String {
    let suggested = sanitize(artifact.filename());
    if !suggested.is_empty() {
        return suggested;
    }

    let hashed = sanitize(&hashed_filename(artifact.source_url(), artifact.content()));
    if hashed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else if hashed.to_ascii_lowercase().ends_with(".pdf") {
        hashed
    } else {
        format!("{}.pdf", hashed)
    }
}

/// Keep a name inside the target directory
fn sanitize(name: &str) -> String {
    name.trim()
        .replace(['/', '\\'], "-")
        .trim_start_matches('.')
        .to_string()
}

/// Save `artifact` under `directory`, creating it if needed.
///
/// Returns the path written.
pub async fn save_artifact(directory: &Path, artifact: &RetrievedArtifact) -> Result<PathBuf, StorageError> {
    if let Some(reason) = artifact.soft_error() {
        return Err(StorageError::NoContent {
            url: artifact.source_url().to_string(),
            reason: reason.to_string(),
        });
    }

    tokio::fs::create_dir_all(directory).await?;

    let path = directory.join(filename_for(artifact));
    tokio::fs::write(&path, artifact.content()).await?;

    tracing::info!("Saved {} ({} bytes)", path.display(), artifact.content().len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_uses_suggested_name() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("papers");
        let artifact = RetrievedArtifact::success(
            b"%PDF-1.4 x".to_vec(),
            "https://sci-hub.se/10.1038/nature14539",
            "10.1038-nature14539.pdf",
        );

        let path = save_artifact(&target, &artifact).await.unwrap();

        assert_eq!(path, target.join("10.1038-nature14539.pdf"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4 x");
    }

    #[tokio::test]
    async fn test_save_refuses_failed_artifact() {
        let dir = TempDir::new().unwrap();
        let artifact = RetrievedArtifact::failed("10.1/x", "Downloaded data is not a valid PDF");

        let err = save_artifact(dir.path(), &artifact).await.unwrap_err();

        assert!(matches!(err, StorageError::NoContent { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_filename_falls_back_to_hash() {
        let artifact = RetrievedArtifact::success(
            b"%PDF-1.4".to_vec(),
            "https://cdn.example/downloads/2015/nature14539.pdf#view=FitH",
            "",
        );
        let name = filename_for(&artifact);
        assert!(name.ends_with("nature14539.pdf"), "{}", name);
        assert!(name.len() > 64);
    }

    #[test]
    fn test_filename_cannot_escape_directory() {
        let artifact = RetrievedArtifact::success(b"%PDF".to_vec(), "u", "../../etc/passwd.pdf");
        let name = filename_for(&artifact);
        assert!(!name.contains('/'));
        assert!(!name.starts_with('.'));
    }
}
