//! Sequences one harness run: workspace, build, stage, invoke, run, cleanup.
//!
//! Steps run strictly one after another. The cancellation token is checked
//! between steps and while the fixture runs. Whatever happens, the workspace
//! is released before `execute` returns.
use crate::artifact::{build_argv, build_fixture, format_command_line};
use crate::cancel::CancelToken;
use crate::config::{HarnessConfig, RunConfig};
use crate::error::HarnessResult;
use crate::invocation::{build_args, FixtureArgs};
use crate::library::{resolve_library, LibrarySource, TCL_LIBRARY_ENV};
use crate::report::RunReport;
use crate::runner::{fixture_env, run_fixture, RunOutcome};
use crate::staging::{discover_assets, stage_assets, TestAsset};
use crate::workspace::{Workspace, FIXTURE_NAME};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Everything a run needs, including the bits of the caller's environment
/// that are inherited, so nothing is read from process globals mid-run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub run: RunConfig,
    pub harness: HarnessConfig,
    pub inherited_path: Option<OsString>,
    pub inherited_tcl_library: Option<OsString>,
}

impl RunRequest {
    /// Capture `PATH` and `TCL_LIBRARY` from the current process.
    pub fn from_process_env(run: RunConfig, harness: HarnessConfig) -> Self {
        Self {
            run,
            harness,
            inherited_path: std::env::var_os("PATH"),
            inherited_tcl_library: std::env::var_os(TCL_LIBRARY_ENV),
        }
    }
}

/// Run the whole pipeline, recording progress into `report`.
pub fn execute(
    request: &RunRequest,
    cancel: &CancelToken,
    report: &mut RunReport,
) -> HarnessResult<RunOutcome> {
    let result = execute_inner(request, cancel, report);
    match &result {
        Ok(outcome) => report.record_outcome(outcome),
        Err(err) => {
            tracing::error!(kind = err.kind(), error = %err, "run failed");
            report.record_error(err);
        }
    }
    result
}

fn execute_inner(
    request: &RunRequest,
    cancel: &CancelToken,
    report: &mut RunReport,
) -> HarnessResult<RunOutcome> {
    request.run.validate()?;
    request.harness.validate()?;
    cancel.check("workspace setup")?;

    let mut workspace = Workspace::acquire(&request.harness.workspace_prefix)?;
    let result = run_in_workspace(request, &mut workspace, cancel, report);
    let released = workspace.release();
    match (result, released) {
        (Err(err), Err(cleanup)) => {
            tracing::warn!(error = %cleanup, "workspace cleanup failed after run error");
            Err(err)
        }
        (Err(err), Ok(())) => Err(err),
        (Ok(_), Err(cleanup)) => Err(cleanup),
        (Ok(outcome), Ok(())) => Ok(outcome),
    }
}

fn run_in_workspace(
    request: &RunRequest,
    workspace: &mut Workspace,
    cancel: &CancelToken,
    report: &mut RunReport,
) -> HarnessResult<RunOutcome> {
    let harness = &request.harness;
    let original_dir = workspace.original_dir().to_path_buf();
    let fixture = workspace.fixture_path();
    report.workspace = Some(workspace.path().to_path_buf());

    cancel.check("build")?;
    let build_args_list = build_argv(&harness.build, &fixture)?;
    report.build_command = Some(format_command_line(&harness.build.program, &build_args_list));
    build_fixture(&harness.build, &fixture, &original_dir)?;

    cancel.check("staging")?;
    let source_dir = original_dir.join(&harness.source_dir);
    let assets = discover_assets(&source_dir, &harness.pattern, &harness.skip)?;
    workspace.enter()?;
    stage_assets(&assets, workspace.path())?;
    report.staged = asset_names(&assets);

    let explicit_library = harness
        .tcl_library
        .as_ref()
        .map(|path| original_dir.join(path));
    let library = resolve_library(
        explicit_library.as_deref(),
        request.inherited_tcl_library.clone(),
    )?;
    report.library_source = Some(library.describe());
    let library_files = library.materialize(&workspace.library_path())?;
    tracing::info!(
        source = %library.describe(),
        files = library_files,
        "materialized runtime library"
    );

    let args = build_args(&request.run);
    report.fixture_args = args.clone();
    let env = fixture_env(
        workspace.path(),
        &workspace.library_path(),
        request.inherited_path.clone(),
    )?;

    cancel.check("fixture run")?;
    run_fixture(workspace.path(), &fixture, &args, &env, cancel)
}

fn asset_names(assets: &[TestAsset]) -> Vec<String> {
    assets.iter().map(|asset| asset.file_name.clone()).collect()
}

/// What a run would do, computed without building or running anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPlan {
    pub build_command: String,
    pub source_dir: PathBuf,
    pub staged: Vec<String>,
    pub skipped: Vec<String>,
    pub library_source: Option<String>,
    pub fixture_args: FixtureArgs,
}

/// Resolve the plan for `request` relative to `cwd`.
///
/// Discovery failures are errors; an unresolvable library is reported as
/// `None` since it only matters once a run starts.
pub fn plan(request: &RunRequest, cwd: &Path) -> HarnessResult<RunPlan> {
    request.run.validate()?;
    request.harness.validate()?;
    let harness = &request.harness;

    let placeholder = Path::new("$WORK").join(FIXTURE_NAME);
    let build_command =
        format_command_line(&harness.build.program, &build_argv(&harness.build, &placeholder)?);

    let source_dir = cwd.join(&harness.source_dir);
    let assets = discover_assets(&source_dir, &harness.pattern, &harness.skip)?;
    let unfiltered = discover_assets(&source_dir, &harness.pattern, &Default::default())?;
    let staged = asset_names(&assets);
    let skipped = unfiltered
        .into_iter()
        .map(|asset| asset.file_name)
        .filter(|name| !staged.contains(name))
        .collect();

    let explicit_library = harness.tcl_library.as_ref().map(|path| cwd.join(path));
    let library_source = match resolve_library(
        explicit_library.as_deref(),
        request.inherited_tcl_library.clone(),
    ) {
        Ok(library) => Some(library.describe()),
        Err(err) => {
            tracing::debug!(error = %err, "library not resolvable while planning");
            None
        }
    };

    Ok(RunPlan {
        build_command,
        source_dir,
        staged,
        skipped,
        library_source,
        fixture_args: build_args(&request.run),
    })
}
