//! Materializes the Tcl runtime support library into the workspace.
//!
//! The fixture's interpreter needs `init.tcl` and friends at the path named by
//! `TCL_LIBRARY`. We copy an installed library tree rather than relying on
//! whatever the host has configured, so the workspace is self-contained.
use crate::error::{HarnessError, HarnessResult};
use crate::staging::collect_files_recursive;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Environment variable the Tcl runtime reads its library location from.
pub const TCL_LIBRARY_ENV: &str = "TCL_LIBRARY";
const TCL_INIT_SCRIPT: &str = "init.tcl";

pub trait LibrarySource {
    /// Human readable origin, for logs and reports.
    fn describe(&self) -> String;

    /// Populate `dest` with the library; returns the number of files written.
    fn materialize(&self, dest: &Path) -> HarnessResult<usize>;
}

/// An installed library directory copied file by file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl LibrarySource for DirectoryLibrary {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn materialize(&self, dest: &Path) -> HarnessResult<usize> {
        if !self.root.join(TCL_INIT_SCRIPT).is_file() {
            return Err(HarnessError::Library {
                detail: format!(
                    "{} does not look like a Tcl library (no {TCL_INIT_SCRIPT})",
                    self.root.display()
                ),
            });
        }
        let files = collect_files_recursive(&self.root).map_err(library_error)?;
        for file in &files {
            let rel = file.strip_prefix(&self.root).map_err(|err| HarnessError::Library {
                detail: format!("relativize {}: {err}", file.display()),
            })?;
            let target = dest.join(rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| library_error(HarnessError::io("create", parent, err)))?;
            }
            fs::copy(file, &target)
                .map_err(|err| library_error(HarnessError::io("copy", file, err)))?;
        }
        Ok(files.len())
    }
}

fn library_error(err: HarnessError) -> HarnessError {
    match err {
        HarnessError::Library { .. } => err,
        other => HarnessError::Library {
            detail: other.to_string(),
        },
    }
}

/// Pick the library to stage: an explicit directory, then the caller's
/// inherited `TCL_LIBRARY`, then whatever `tclsh` reports for `info library`.
pub fn resolve_library(
    explicit: Option<&Path>,
    inherited: Option<OsString>,
) -> HarnessResult<DirectoryLibrary> {
    if let Some(path) = explicit {
        return Ok(DirectoryLibrary::new(path));
    }
    if let Some(value) = inherited.filter(|value| !value.is_empty()) {
        tracing::debug!(value = ?value, "using inherited {TCL_LIBRARY_ENV}");
        return Ok(DirectoryLibrary::new(PathBuf::from(value)));
    }
    query_tclsh().map(DirectoryLibrary::new)
}

fn query_tclsh() -> HarnessResult<PathBuf> {
    let tclsh = which::which("tclsh").map_err(|err| HarnessError::Library {
        detail: format!("no library configured and tclsh not found: {err}"),
    })?;
    let mut child = Command::new(&tclsh)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| HarnessError::Library {
            detail: format!("spawn {}: {err}", tclsh.display()),
        })?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(b"puts [info library]\n")
            .map_err(|err| HarnessError::Library {
                detail: format!("write to tclsh: {err}"),
            })?;
    }
    let output = child.wait_with_output().map_err(|err| HarnessError::Library {
        detail: format!("wait for tclsh: {err}"),
    })?;
    if !output.status.success() {
        return Err(HarnessError::Library {
            detail: format!(
                "tclsh exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    let reported = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if reported.is_empty() {
        return Err(HarnessError::Library {
            detail: "tclsh reported an empty library path".to_string(),
        });
    }
    tracing::debug!(tclsh = %tclsh.display(), library = %reported, "resolved library via tclsh");
    Ok(PathBuf::from(reported))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_library(root: &Path) {
        fs::create_dir_all(root.join("encoding")).expect("create library");
        fs::write(root.join("init.tcl"), "# init\n").expect("init.tcl");
        fs::write(root.join("encoding/ascii.enc"), "ascii\n").expect("encoding");
    }

    #[test]
    fn directory_library_copies_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("tcl8.6");
        fake_library(&src);
        let dest = dir.path().join("ws/library");

        let count = DirectoryLibrary::new(&src).materialize(&dest).expect("materialize");
        assert_eq!(count, 2);
        assert_eq!(fs::read_to_string(dest.join("init.tcl")).expect("read"), "# init\n");
        assert!(dest.join("encoding/ascii.enc").is_file());
    }

    #[test]
    fn directory_without_init_script_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = DirectoryLibrary::new(dir.path())
            .materialize(&dir.path().join("out"))
            .expect_err("not a library");
        assert_eq!(err.kind(), "library");
    }

    #[test]
    fn explicit_library_wins_over_inherited() {
        let chosen = resolve_library(
            Some(Path::new("/opt/tcl/lib/tcl8.6")),
            Some(OsString::from("/usr/share/tcltk/tcl8.6")),
        )
        .expect("resolve");
        assert_eq!(chosen.root(), Path::new("/opt/tcl/lib/tcl8.6"));

        let inherited =
            resolve_library(None, Some(OsString::from("/usr/share/tcltk/tcl8.6"))).expect("env");
        assert_eq!(inherited.root(), Path::new("/usr/share/tcltk/tcl8.6"));
    }
}
