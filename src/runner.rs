//! Runs the fixture inside the workspace.
//!
//! The fixture's stdout and stderr are the harness's own, so output streams
//! live. Only the exit status is inspected.
use crate::cancel::CancelToken;
use crate::error::{HarnessError, HarnessResult};
use crate::library::TCL_LIBRARY_ENV;
use serde::Serialize;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const PATH_ENV: &str = "PATH";
const POLL_INTERVAL_MILLIS: u64 = 25;

/// Environment variables set on the fixture process.
pub type FixtureEnv = Vec<(&'static str, OsString)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub exit_code: Option<i32>,
    pub elapsed_ms: u64,
}

/// Fail before spawning anything on hosts where the search-path setup is not
/// implemented.
pub fn ensure_supported_platform(os: &'static str) -> HarnessResult<()> {
    if os == "windows" {
        return Err(HarnessError::UnsupportedPlatform { os });
    }
    Ok(())
}

/// `TCL_LIBRARY` pointing at the staged library, and `PATH` with the
/// workspace prepended so the fixture finds helper programs staged beside it.
pub fn fixture_env(
    workspace: &Path,
    library: &Path,
    inherited_path: Option<OsString>,
) -> HarnessResult<FixtureEnv> {
    let mut entries = vec![workspace.to_path_buf()];
    if let Some(inherited) = inherited_path.filter(|value| !value.is_empty()) {
        entries.extend(std::env::split_paths(&inherited));
    }
    let path = std::env::join_paths(entries).map_err(|err| HarnessError::Execution {
        detail: format!("build {PATH_ENV} for {}: {err}", workspace.display()),
    })?;
    Ok(vec![
        (TCL_LIBRARY_ENV, library.as_os_str().to_os_string()),
        (PATH_ENV, path),
    ])
}

/// Spawn `fixture args...` in `workspace` and wait for it.
///
/// Succeeds only on a zero exit. A cancelled token kills the child.
pub fn run_fixture(
    workspace: &Path,
    fixture: &Path,
    args: &[String],
    env: &FixtureEnv,
    cancel: &CancelToken,
) -> HarnessResult<RunOutcome> {
    ensure_supported_platform(std::env::consts::OS)?;

    let mut command = Command::new(fixture);
    command
        .args(args)
        .current_dir(workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    for (key, value) in env {
        command.env(key, value);
    }

    tracing::info!(
        fixture = %fixture.display(),
        args = %shell_words::join(args),
        "running fixture"
    );
    let start = Instant::now();
    let mut child = command.spawn().map_err(|err| HarnessError::Execution {
        detail: format!("start {}: {err}", fixture.display()),
    })?;
    let status = wait_for_child(&mut child, cancel)?;
    let outcome = RunOutcome {
        exit_code: status.code(),
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    tracing::info!(
        elapsed_ms = outcome.elapsed_ms,
        exit_code = ?outcome.exit_code,
        "fixture exited"
    );

    if !status.success() {
        return Err(HarnessError::Execution {
            detail: format!("{} {status}", fixture.display()),
        });
    }
    Ok(outcome)
}

fn wait_for_child(child: &mut Child, cancel: &CancelToken) -> HarnessResult<ExitStatus> {
    let poll_interval = Duration::from_millis(POLL_INTERVAL_MILLIS);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if cancel.is_cancelled() {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::warn!("fixture killed after cancellation");
                    return Err(HarnessError::Cancelled {
                        stage: "fixture exited",
                    });
                }
                thread::sleep(poll_interval);
            }
            Err(err) => {
                return Err(HarnessError::Execution {
                    detail: format!("wait for fixture: {err}"),
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
