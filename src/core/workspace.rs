//! Request-scoped workspace for transient audio files.
//!
//! Every file the pipeline writes for a request (the staged upload, a
//! converted WAV, each segment clip) is registered here. Registered files
//! are released exactly once: explicitly as soon as they are no longer
//! needed, and otherwise when the workspace is closed or dropped. The
//! directory is unique per request, so concurrent requests never collide.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

/// Owner of one request's transient files
#[derive(Debug)]
pub struct RequestWorkspace {
    request_id: Uuid,
    dir: Option<TempDir>,
    artifacts: Vec<PathBuf>,
    released: usize,
}

/// Keep file names to a safe character set
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "audio".to_string()
    } else {
        cleaned.to_string()
    }
}

impl RequestWorkspace {
    /// Create a private directory for `request_id` under `root`
    pub fn create(root: &Path, request_id: Uuid) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", request_id))
            .tempdir_in(root)?;

        debug!(%request_id, dir = %dir.path().display(), "Created request workspace");

        Ok(Self {
            request_id,
            dir: Some(dir),
            artifacts: Vec::new(),
            released: 0,
        })
    }

    /// Directory holding this request's files
    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .map(|d| d.path())
            .unwrap_or_else(|| Path::new(""))
    }

    /// Files registered and not yet released
    pub fn live_artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Number of files released so far
    pub fn released_count(&self) -> usize {
        self.released
    }

    /// Register a file for release
    pub fn register(&mut self, path: PathBuf) -> PathBuf {
        if !self.artifacts.contains(&path) {
            self.artifacts.push(path.clone());
        }
        path
    }

    /// Write the uploaded audio into the workspace. The staged name is
    /// prefixed so it never collides with a derived file.
    pub fn stage_upload(&mut self, bytes: &[u8], filename: &str) -> io::Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let path = self
            .path()
            .join(format!("upload_{}", sanitize_component(&name)));

        // registered before writing so a partial file is still released
        let path = self.register(path);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Register and return a path for the converted source audio
    pub fn converted_path(&mut self) -> PathBuf {
        let path = self.path().join("source.wav");
        self.register(path)
    }

    /// Register and return a path for a segment clip
    pub fn clip_path(&mut self, speaker: &str, start_ms: u64) -> PathBuf {
        let path = self
            .path()
            .join(format!("segment_{}_{}.wav", sanitize_component(speaker), start_ms));
        self.register(path)
    }

    /// Release one registered file. Unregistered paths are ignored, so a
    /// file is never released twice. A file that cannot be removed stays
    /// registered for the final cleanup.
    pub fn release(&mut self, path: &Path) -> io::Result<()> {
        let Some(index) = self.artifacts.iter().position(|p| p == path) else {
            return Ok(());
        };

        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        self.artifacts.swap_remove(index);
        self.released += 1;
        Ok(())
    }

    /// Release every remaining file
    fn release_all(&mut self) -> io::Result<()> {
        let mut first_error = None;

        for path in std::mem::take(&mut self.artifacts) {
            match std::fs::remove_file(&path) {
                Ok(()) => self.released += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => self.released += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to release artifact");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Release all files and remove the workspace directory
    pub fn close(mut self) -> io::Result<()> {
        let released = self.release_all();
        let removed = match self.dir.take() {
            Some(dir) => dir.close(),
            None => Ok(()),
        };
        debug!(request_id = %self.request_id, released = self.released, "Closed request workspace");
        released.and(removed)
    }
}

impl Drop for RequestWorkspace {
    fn drop(&mut self) {
        if self.dir.is_none() {
            return;
        }
        if let Err(e) = self.release_all() {
            warn!(request_id = %self.request_id, error = %e, "Workspace cleanup incomplete");
        }
        // TempDir removes the directory itself on drop
    }
}
