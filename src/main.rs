use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tclharness::cli::{Command, PlanArgs, RootArgs, RunArgs};
use tclharness::report::{write_report, RunReport};
use tclharness::{execute, logging, plan, CancelToken, RunPlan, RunRequest};

fn main() -> ExitCode {
    let args = RootArgs::parse();
    logging::init_tracing(args.debug);

    let result = match args.command {
        Command::Run(run) => cmd_run(run),
        Command::Plan(plan) => cmd_plan(plan),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let run = args.harness.run_config();
    let harness = args.harness.harness_config()?;
    let request = RunRequest::from_process_env(run, harness);
    let cancel = CancelToken::new();

    let mut report = RunReport::new(&request.run);
    let result = execute(&request, &cancel, &mut report);
    if let Some(path) = &args.report {
        write_report(path, &report)?;
        tracing::info!(report = %path.display(), "wrote run report");
    }
    let outcome = result.context("tcl test suite failed")?;
    tracing::info!(elapsed_ms = outcome.elapsed_ms, "tcl test suite passed");
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> Result<()> {
    let run = args.harness.run_config();
    let harness = args.harness.harness_config()?;
    let request = RunRequest::from_process_env(run, harness);
    let cwd = std::env::current_dir().context("read working directory")?;

    let plan = plan(&request, &cwd)?;
    if args.json {
        let text = serde_json::to_string_pretty(&plan).context("serialize plan")?;
        println!("{text}");
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &RunPlan) {
    println!("build: {}", plan.build_command);
    println!("source: {}", plan.source_dir.display());
    println!("staged ({}):", plan.staged.len());
    for name in &plan.staged {
        println!("  {name}");
    }
    if !plan.skipped.is_empty() {
        println!("skipped: {}", plan.skipped.join(", "));
    }
    println!(
        "library: {}",
        plan.library_source.as_deref().unwrap_or("<unresolved>")
    );
    println!(
        "fixture: testfixture {}",
        shell_words::join(&plan.fixture_args)
    );
}
