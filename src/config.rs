//! Run options and harness configuration.
//!
//! `RunConfig` carries the four options forwarded to the fixture. The rest of
//! the harness (where the suite lives, how the fixture is built, where the Tcl
//! library comes from) lives in `HarnessConfig`, merged from defaults, an
//! optional JSON file, and command-line overrides in that order.
use crate::error::{HarnessError, HarnessResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Suite directory, relative to the invoking directory.
pub const DEFAULT_SOURCE_DIR: &str = "testdata/tcl";
pub const DEFAULT_PATTERN: &str = "*";
pub const DEFAULT_WORKSPACE_PREFIX: &str = "sqlite-test-";
pub const DEFAULT_VERBOSE: &str = "0";
pub const DEFAULT_BUILD_PROGRAM: &str = "go";
pub const DEFAULT_FIXTURE_PACKAGE: &str = "modernc.org/sqlite/internal/testfixture";
/// Tag that is always passed to the fixture build.
pub const DEFAULT_BUILD_TAG: &str = "libc.nofsync";

/// Options forwarded to the fixture, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    /// Empty runs `all.test`; otherwise space separated permutation arguments.
    pub suite: String,
    pub verbose: String,
    /// Zero means no limit.
    pub max_error: u32,
    /// `[$permutation:]$testfile`, empty when unset.
    pub start: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            suite: String::new(),
            verbose: DEFAULT_VERBOSE.to_string(),
            max_error: 0,
            start: String::new(),
        }
    }
}

impl RunConfig {
    /// Values go to the fixture verbatim; only what cannot become a process
    /// argument is rejected here.
    pub fn validate(&self) -> HarnessResult<()> {
        for (name, value) in [
            ("suite", &self.suite),
            ("verbose", &self.verbose),
            ("start", &self.start),
        ] {
            if value.contains('\0') {
                return Err(HarnessError::Config {
                    detail: format!("{name} contains a NUL byte (got {value:?})"),
                });
            }
        }
        Ok(())
    }
}

/// How the fixture executable is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub program: String,
    pub package: String,
    pub tag: String,
    /// Extra comma separated tags appended after `tag`; empty when unset.
    #[serde(default)]
    pub extra_tags: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_BUILD_PROGRAM.to_string(),
            package: DEFAULT_FIXTURE_PACKAGE.to_string(),
            tag: DEFAULT_BUILD_TAG.to_string(),
            extra_tags: String::new(),
        }
    }
}

/// Resolved harness settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessConfig {
    pub source_dir: PathBuf,
    pub pattern: String,
    /// Base filenames never staged, matched exactly.
    pub skip: BTreeSet<String>,
    pub build: BuildConfig,
    /// Installed Tcl library to copy into the workspace; resolved at run time
    /// when unset.
    pub tcl_library: Option<PathBuf>,
    pub workspace_prefix: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            pattern: DEFAULT_PATTERN.to_string(),
            skip: BTreeSet::new(),
            build: BuildConfig::default(),
            tcl_library: None,
            workspace_prefix: DEFAULT_WORKSPACE_PREFIX.to_string(),
        }
    }
}

/// On-disk config shape. Every field is optional; unknown fields are errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub skip: Vec<String>,
    #[serde(default)]
    pub build: Option<BuildFileConfig>,
    #[serde(default)]
    pub tcl_library: Option<PathBuf>,
    #[serde(default)]
    pub workspace_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildFileConfig {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Values given on the command line; `None` leaves the lower layer in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarnessOverrides {
    pub source_dir: Option<PathBuf>,
    pub pattern: Option<String>,
    /// Added to the file's skip-list rather than replacing it.
    pub skip: Vec<String>,
    pub build_program: Option<String>,
    pub build_package: Option<String>,
    pub extra_tags: Option<String>,
    pub tcl_library: Option<PathBuf>,
}

/// Load a JSON config file.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ConfigFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

impl HarnessConfig {
    /// Layer the config file and command-line overrides over the defaults.
    pub fn resolve(file: Option<ConfigFile>, overrides: HarnessOverrides) -> HarnessResult<Self> {
        let mut config = HarnessConfig::default();
        if let Some(file) = file {
            config.apply_file(file);
        }
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(source_dir) = file.source_dir {
            self.source_dir = source_dir;
        }
        if let Some(pattern) = file.pattern {
            self.pattern = pattern;
        }
        self.skip.extend(file.skip);
        if let Some(build) = file.build {
            if let Some(program) = build.program {
                self.build.program = program;
            }
            if let Some(package) = build.package {
                self.build.package = package;
            }
            if let Some(tag) = build.tag {
                self.build.tag = tag;
            }
        }
        if file.tcl_library.is_some() {
            self.tcl_library = file.tcl_library;
        }
        if let Some(prefix) = file.workspace_prefix {
            self.workspace_prefix = prefix;
        }
    }

    fn apply_overrides(&mut self, overrides: HarnessOverrides) {
        if let Some(source_dir) = overrides.source_dir {
            self.source_dir = source_dir;
        }
        if let Some(pattern) = overrides.pattern {
            self.pattern = pattern;
        }
        self.skip.extend(overrides.skip);
        if let Some(program) = overrides.build_program {
            self.build.program = program;
        }
        if let Some(package) = overrides.build_package {
            self.build.package = package;
        }
        if let Some(extra_tags) = overrides.extra_tags {
            self.build.extra_tags = extra_tags;
        }
        if overrides.tcl_library.is_some() {
            self.tcl_library = overrides.tcl_library;
        }
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.pattern.trim().is_empty() {
            return Err(config_error("pattern must be non-empty"));
        }
        if self.pattern.contains('/') || self.pattern.contains('\\') {
            return Err(config_error(format!(
                "pattern matches base filenames only (got {:?})",
                self.pattern
            )));
        }
        if self.build.program.trim().is_empty() {
            return Err(config_error("build program must be non-empty"));
        }
        if self.build.package.trim().is_empty() {
            return Err(config_error("fixture package must be non-empty"));
        }
        Ok(())
    }
}

fn config_error(detail: impl Into<String>) -> HarnessError {
    HarnessError::Config {
        detail: detail.into(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
