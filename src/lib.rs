//! Orchestrates SQLite's Tcl conformance suite against a freshly built
//! testfixture.
//!
//! A run builds the fixture into a temporary workspace, stages the suite's
//! test definitions and the Tcl runtime library beside it, runs the fixture
//! there and reports pass or fail from its exit status alone.
pub mod artifact;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod invocation;
pub mod library;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod staging;
pub mod workspace;

pub use cancel::CancelToken;
pub use config::{HarnessConfig, RunConfig};
pub use error::{HarnessError, HarnessResult};
pub use invocation::{build_args, FixtureArgs};
pub use pipeline::{execute, plan, RunPlan, RunRequest};
pub use report::RunReport;
pub use workspace::Workspace;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::sync::{Mutex, MutexGuard};

    static CWD_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that change the process working directory or spawn
    /// freshly written scripts (a concurrent fork can hold the script's write
    /// descriptor open and make exec fail with ETXTBSY).
    pub(crate) fn cwd_lock() -> MutexGuard<'static, ()> {
        CWD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(unix)]
    pub(crate) fn write_script(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        std::fs::write(path, format!("#!/bin/sh\n{body}")).expect("write script");
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
    }
}
