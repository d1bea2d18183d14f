//! CLI argument parsing.
//!
//! The CLI only gathers options; `pipeline` does the work. Each fixture option
//! can also come from a `TCLHARNESS_*` environment variable so outer test
//! runners can drive the harness without rewriting its command line.
use crate::config::{
    load_config_file, HarnessConfig, HarnessOverrides, RunConfig, DEFAULT_VERBOSE,
};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tclharness",
    version,
    about = "Build the SQLite testfixture and run the Tcl conformance suite",
    after_help = "Examples:\n  tclharness run\n  tclharness run --suite \"veryquick select1.test\" --verbose 1\n  tclharness run --maxerror 10 --start veryquick:select1.test\n  tclharness plan --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log at debug level unless TCLHARNESS_LOG or RUST_LOG say otherwise
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Plan(PlanArgs),
}

/// Build the fixture, stage the suite and run it.
#[derive(Parser, Debug)]
#[command(about = "Build the fixture, stage the suite and run it")]
pub struct RunArgs {
    #[command(flatten)]
    pub harness: HarnessArgs,

    /// Write a JSON run report here, on success and on failure
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Show what a run would do without building or running anything.
#[derive(Parser, Debug)]
#[command(about = "Show the build command, staged files and fixture arguments")]
pub struct PlanArgs {
    #[command(flatten)]
    pub harness: HarnessArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct HarnessArgs {
    /// Permutation and test files to run; empty runs all.test
    #[arg(long, env = "TCLHARNESS_SUITE", default_value = "")]
    pub suite: String,

    /// -verbose value for the suite: 0, 1 or "file"
    #[arg(long, env = "TCLHARNESS_VERBOSE", default_value = DEFAULT_VERBOSE)]
    pub verbose: String,

    /// -maxerror value for the suite; 0 means no limit
    #[arg(long, env = "TCLHARNESS_MAXERROR", default_value_t = 0)]
    pub maxerror: u32,

    /// -start value for the suite: [$permutation:]$testfile
    #[arg(long, env = "TCLHARNESS_START", default_value = "")]
    pub start: String,

    /// Extra build tags, comma separated
    #[arg(long, env = "TCLHARNESS_XTAGS")]
    pub xtags: Option<String>,

    /// JSON config file with suite and build settings
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the test-definition files
    #[arg(long, value_name = "DIR")]
    pub source_dir: Option<PathBuf>,

    /// Base-name glob selecting files to stage
    #[arg(long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// Base filename to leave out of the workspace (repeatable)
    #[arg(long = "skip", value_name = "NAME")]
    pub skip: Vec<String>,

    /// Installed Tcl library directory to copy into the workspace
    #[arg(long, value_name = "DIR")]
    pub tcl_library: Option<PathBuf>,

    /// Toolchain used to build the fixture
    #[arg(long = "go", value_name = "PROG")]
    pub build_program: Option<String>,

    /// Package path of the fixture
    #[arg(long = "package", value_name = "PKG")]
    pub build_package: Option<String>,
}

impl HarnessArgs {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            suite: self.suite.clone(),
            verbose: self.verbose.clone(),
            max_error: self.maxerror,
            start: self.start.clone(),
        }
    }

    /// Layer the config file (if any) and these flags over the defaults.
    pub fn harness_config(&self) -> Result<HarnessConfig> {
        let file = self
            .config
            .as_deref()
            .map(load_config_file)
            .transpose()?;
        let overrides = HarnessOverrides {
            source_dir: self.source_dir.clone(),
            pattern: self.pattern.clone(),
            skip: self.skip.clone(),
            build_program: self.build_program.clone(),
            build_package: self.build_package.clone(),
            extra_tags: self.xtags.clone(),
            tcl_library: self.tcl_library.clone(),
        };
        Ok(HarnessConfig::resolve(file, overrides)?)
    }
}
