//! On-disk archive for uploaded audio and transcripts.
//!
//! Each upload gets its own directory so two uploads with the same file
//! name never overwrite each other:
//!
//! ```text
//! <root>/<upload-id>/<filename>
//! <root>/<upload-id>/<stem>.txt
//! ```

use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

use sym_core::error::{Result, SymError};

/// Reduce a client-supplied file name to its final path component.
///
/// Both `/` and `\` count as separators. Empty names and dot components
/// are rejected.
pub fn sanitize_filename(raw: &str) -> Result<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(SymError::Validation(format!("invalid file name: {:?}", raw)));
    }
    Ok(name.to_string())
}

/// Paths written for one archived upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedUpload {
    pub audio_path: PathBuf,
    pub transcript_path: PathBuf,
}

/// Writes uploaded audio and its transcript under a root directory.
#[derive(Debug, Clone)]
pub struct TranscriptArchive {
    root: PathBuf,
}

impl TranscriptArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist the audio bytes and the transcript text.
    ///
    /// `filename` must already be sanitized.
    pub async fn save(&self, filename: &str, audio: &[u8], transcript: &str) -> Result<ArchivedUpload> {
        let dir = self.root.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let audio_path = dir.join(filename);
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let transcript_path = dir.join(format!("{}.txt", stem));

        tokio::fs::write(&audio_path, audio).await?;
        tokio::fs::write(&transcript_path, transcript).await?;

        info!(
            audio = %audio_path.display(),
            transcript = %transcript_path.display(),
            "Upload archived"
        );

        Ok(ArchivedUpload {
            audio_path,
            transcript_path,
        })
    }
}
