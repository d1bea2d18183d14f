//! Scoped temporary workspace for one harness run.
//!
//! The workspace owns a fresh temp directory and, once entered, the process
//! working directory. Both are given back on `release` or, failing that, on
//! drop, so every exit path (early `?` return, panic, cancellation) leaves the
//! caller where it started with no directory left behind.
use crate::error::{HarnessError, HarnessResult};
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name of the built fixture inside the workspace.
pub const FIXTURE_NAME: &str = "testfixture";
/// Directory the runtime support library is materialized into.
pub const LIBRARY_DIR: &str = "library";

#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
    original_dir: PathBuf,
    entered: bool,
}

impl Workspace {
    /// Create a temp directory named `<prefix>XXXX` and remember the current
    /// working directory.
    pub fn acquire(prefix: &str) -> HarnessResult<Self> {
        let original_dir = env::current_dir()
            .map_err(|err| HarnessError::io("read working directory", ".", err))?;
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|err| HarnessError::io("create workspace in", env::temp_dir(), err))?;
        // Canonical so PATH entries and child cwd agree with what the fixture sees.
        let root = dir
            .path()
            .canonicalize()
            .map_err(|err| HarnessError::io("resolve workspace", dir.path(), err))?;
        tracing::info!(workspace = %root.display(), "workspace acquired");
        Ok(Self {
            dir: Some(dir),
            root,
            original_dir,
            entered: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Working directory at acquisition time; relative suite paths resolve
    /// against it.
    pub fn original_dir(&self) -> &Path {
        &self.original_dir
    }

    pub fn fixture_path(&self) -> PathBuf {
        self.root.join(FIXTURE_NAME)
    }

    pub fn library_path(&self) -> PathBuf {
        self.root.join(LIBRARY_DIR)
    }

    /// Switch the process working directory into the workspace.
    pub fn enter(&mut self) -> HarnessResult<()> {
        env::set_current_dir(&self.root)
            .map_err(|err| HarnessError::io("enter workspace", &self.root, err))?;
        self.entered = true;
        tracing::debug!(workspace = %self.root.display(), "entered workspace");
        Ok(())
    }

    /// Restore the original working directory and remove the workspace tree.
    pub fn release(mut self) -> HarnessResult<()> {
        self.cleanup()
    }

    fn cleanup(&mut self) -> HarnessResult<()> {
        let mut first_error = None;
        if self.entered {
            self.entered = false;
            if let Err(err) = env::set_current_dir(&self.original_dir) {
                first_error = Some(HarnessError::io(
                    "restore working directory",
                    &self.original_dir,
                    err,
                ));
            }
        }
        if let Some(dir) = self.dir.take() {
            if let Err(err) = dir.close() {
                let err = HarnessError::io("remove workspace", &self.root, err);
                if first_error.is_none() {
                    first_error = Some(err);
                }
            } else {
                tracing::debug!(workspace = %self.root.display(), "workspace removed");
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(err) = self.cleanup() {
            tracing::warn!(error = %err, "workspace cleanup failed");
        }
    }
}
