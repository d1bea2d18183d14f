//! Shared test infrastructure for integration tests.
//!
//! A `Project` is a scratch directory laid out like the module being tested:
//! `testdata/tcl/` with test definitions, a fake Tcl library, and a fake `go`
//! whose `build` writes a shell-script testfixture. The fixture records its
//! argv, working directory and environment under `record/` so tests can
//! inspect a run after its workspace is gone.
#![allow(dead_code)]

use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tclharness::config::HarnessConfig;
use tclharness::{RunConfig, RunRequest};
use tempfile::TempDir;

static CWD_LOCK: Mutex<()> = Mutex::new(());
static PREFIX_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Serialize tests that let the harness change the working directory.
pub fn cwd_lock() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Project {
    pub dir: TempDir,
    pub workspace_prefix: String,
}

impl Project {
    /// Project with the given test definitions and a fixture exiting `fixture_exit`.
    pub fn new(files: &[(&str, &str)], fixture_exit: i32) -> Self {
        let dir = TempDir::new().expect("create project dir");
        let suite = dir.path().join("testdata/tcl");
        fs::create_dir_all(&suite).expect("create suite dir");
        for (name, contents) in files {
            fs::write(suite.join(name), contents.as_bytes()).expect("write test definition");
        }

        let library = dir.path().join("tcl8.6");
        fs::create_dir_all(library.join("encoding")).expect("create library");
        fs::write(library.join("init.tcl"), "# tcl init\n").expect("write init.tcl");
        fs::write(library.join("encoding/ascii.enc"), "ascii\n").expect("write encoding");

        fs::create_dir_all(dir.path().join("record")).expect("create record dir");
        let project = Self {
            workspace_prefix: format!(
                "tclharness-it-{}-{}-",
                std::process::id(),
                PREFIX_COUNTER.fetch_add(1, Ordering::SeqCst)
            ),
            dir,
        };
        project.write_toolchain(fixture_exit, 0);
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn record(&self, name: &str) -> PathBuf {
        self.root().join("record").join(name)
    }

    pub fn read_record(&self, name: &str) -> String {
        fs::read_to_string(self.record(name))
            .unwrap_or_else(|err| panic!("read record {name}: {err}"))
    }

    pub fn toolchain(&self) -> PathBuf {
        self.root().join("bin/go")
    }

    /// Rewrite the fake `go`: it exits `build_exit`, and when that is zero
    /// writes a fixture that exits `fixture_exit`.
    pub fn write_toolchain(&self, fixture_exit: i32, build_exit: i32) {
        self.write_toolchain_script(fixture_exit, build_exit, "");
    }

    /// Fake `go` that also leaves a directory called `name` beside the
    /// fixture, so staging a file of that name into the workspace fails.
    pub fn write_toolchain_occupying(&self, name: &str) {
        let extra = format!("mkdir \"$(dirname \"$3\")/{name}\"\n");
        self.write_toolchain_script(0, 0, &extra);
    }

    fn write_toolchain_script(&self, fixture_exit: i32, build_exit: i32, extra: &str) {
        let record = self.root().join("record");
        let script = format!(
            r#"#!/bin/sh
pwd > '{record}/build-cwd.txt'
printf '%s\n' "$@" > '{record}/build-args.txt'
if [ {build_exit} -ne 0 ]; then
    echo "fake go: build failed" >&2
    exit {build_exit}
fi
cat > "$3" <<'FIXTURE'
#!/bin/sh
printf '%s\n' "$@" > '{record}/args.txt'
pwd > '{record}/pwd.txt'
ls > '{record}/ls.txt'
printf '%s\n' "$TCL_LIBRARY" > '{record}/tcl_library.txt'
printf '%s\n' "$PATH" > '{record}/path.txt'
exit {fixture_exit}
FIXTURE
chmod +x "$3"
{extra}"#,
            record = record.display(),
        );
        let path = self.toolchain();
        fs::create_dir_all(path.parent().expect("bin dir")).expect("create bin dir");
        fs::write(&path, script).expect("write fake go");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake go");
    }

    pub fn harness_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig {
            tcl_library: Some(self.root().join("tcl8.6")),
            workspace_prefix: self.workspace_prefix.clone(),
            ..HarnessConfig::default()
        };
        config.build.program = self.toolchain().to_string_lossy().into_owned();
        config
    }

    /// Request with a relative source dir, as when run from the module root.
    pub fn request(&self, run: RunConfig) -> RunRequest {
        RunRequest {
            run,
            harness: self.harness_config(),
            inherited_path: Some("/usr/bin:/bin".into()),
            inherited_tcl_library: None,
        }
    }

    /// Workspaces from this project still present in the temp dir.
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(env::temp_dir()) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&self.workspace_prefix))
            })
            .collect()
    }
}

/// Run `f` with the process working directory set to `dir`, restoring it after.
pub fn with_cwd<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
    let before = env::current_dir().expect("read cwd");
    env::set_current_dir(dir).expect("enter project");
    let result = f();
    env::set_current_dir(before).expect("restore cwd");
    result
}
