//! Discover test-definition files and stage them into the workspace.
use crate::error::{HarnessError, HarnessResult};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const STAGED_FILE_MODE: u32 = 0o660;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestAsset {
    pub source: PathBuf,
    pub file_name: String,
}

impl TestAsset {
    pub fn destination(&self, root: &Path) -> PathBuf {
        root.join(&self.file_name)
    }
}

/// Translate a base-name glob (`*`, `?`) into an anchored regex.
pub fn glob_regex(pattern: &str) -> HarnessResult<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|err| HarnessError::Config {
        detail: format!("invalid pattern {pattern:?}: {err}"),
    })
}

/// List regular files in `source_dir` whose base name matches `pattern`,
/// dropping skip-listed names. Sorted by file name.
pub fn discover_assets(
    source_dir: &Path,
    pattern: &str,
    skip: &BTreeSet<String>,
) -> HarnessResult<Vec<TestAsset>> {
    let matcher = glob_regex(pattern)?;
    let discovery_error = |source| HarnessError::Discovery {
        dir: source_dir.to_path_buf(),
        source,
    };

    let mut assets = Vec::new();
    let mut skipped = 0usize;
    for entry in fs::read_dir(source_dir).map_err(discovery_error)? {
        let entry = entry.map_err(discovery_error)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        if !matcher.is_match(&name.to_string_lossy()) {
            continue;
        }
        let Some(file_name) = name.to_str() else {
            return Err(discovery_error(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("file name is not valid UTF-8: {}", path.display()),
            )));
        };
        if skip.contains(file_name) {
            skipped += 1;
            continue;
        }
        assets.push(TestAsset {
            file_name: file_name.to_string(),
            source: path,
        });
    }
    assets.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    tracing::debug!(
        dir = %source_dir.display(),
        matched = assets.len(),
        skipped,
        "discovered test definitions"
    );
    Ok(assets)
}

/// Copy every asset into `root`. Stops at the first failure; files already
/// copied stay in place.
pub fn stage_assets(assets: &[TestAsset], root: &Path) -> HarnessResult<()> {
    for asset in assets {
        let bytes = fs::read(&asset.source)
            .map_err(|err| HarnessError::io("read", &asset.source, err))?;
        write_staged_bytes(root, &asset.file_name, &bytes)?;
    }
    tracing::info!(count = assets.len(), root = %root.display(), "staged test definitions");
    Ok(())
}

pub fn write_staged_bytes(root: &Path, rel_path: &str, bytes: &[u8]) -> HarnessResult<()> {
    let staging_path = root.join(rel_path);
    if let Some(parent) = staging_path.parent() {
        fs::create_dir_all(parent).map_err(|err| HarnessError::io("create", parent, err))?;
    }
    fs::write(&staging_path, bytes)
        .map_err(|err| HarnessError::io("write", &staging_path, err))?;
    set_staged_permissions(&staging_path)?;
    Ok(())
}

#[cfg(unix)]
fn set_staged_permissions(path: &Path) -> HarnessResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(STAGED_FILE_MODE))
        .map_err(|err| HarnessError::io("set permissions on", path, err))
}

#[cfg(not(unix))]
fn set_staged_permissions(_path: &Path) -> HarnessResult<()> {
    Ok(())
}

pub fn collect_files_recursive(root: &Path) -> HarnessResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.exists() {
        return Ok(files);
    }
    for entry in fs::read_dir(root).map_err(|err| HarnessError::io("read", root, err))? {
        let entry = entry.map_err(|err| HarnessError::io("read", root, err))?;
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_files_recursive(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "staging_tests.rs"]
mod tests;
