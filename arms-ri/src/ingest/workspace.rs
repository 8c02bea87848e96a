//! Per-batch temporary workspace
//!
//! Each ingestion gets its own directory under the root folder's `tmp/`
//! holding the uploaded document and the parser's two output files. The
//! directory is removed exactly once: by [`BatchWorkspace::release`] on the
//! normal path, or on drop if the batch future is abandoned.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const DOCUMENT_FILE: &str = "result.pdf";
const SCHEME_OUTPUT_FILE: &str = "scheme_output.json";
const RESULT_OUTPUT_FILE: &str = "result_output.json";

#[derive(Debug)]
pub struct BatchWorkspace {
    dir: PathBuf,
    released: bool,
}

impl BatchWorkspace {
    /// Create a fresh, uniquely named workspace directory
    pub async fn acquire(temp_root: &Path) -> io::Result<Self> {
        let dir = temp_root.join(format!("batch-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await?;
        debug!(workspace = %dir.display(), "Batch workspace acquired");

        Ok(Self { dir, released: false })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Where the uploaded document is written
    pub fn document_path(&self) -> PathBuf {
        self.dir.join(DOCUMENT_FILE)
    }

    pub fn scheme_output_path(&self) -> PathBuf {
        self.dir.join(SCHEME_OUTPUT_FILE)
    }

    pub fn result_output_path(&self) -> PathBuf {
        self.dir.join(RESULT_OUTPUT_FILE)
    }

    /// Remove the workspace directory and everything in it
    pub async fn release(mut self) -> io::Result<()> {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                debug!(workspace = %self.dir.display(), "Batch workspace removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for BatchWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(workspace = %self.dir.display(), error = %e, "Failed to remove batch workspace");
            }
        }
    }
}
