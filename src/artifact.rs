//! Builds the fixture executable with the host toolchain.
use crate::config::BuildConfig;
use crate::error::{HarnessError, HarnessResult};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

/// `-tags=<baked-in>[,<extra>]`.
pub fn tags_arg(config: &BuildConfig) -> String {
    let mut tags = format!("-tags={}", config.tag);
    if !config.extra_tags.is_empty() {
        tags.push(',');
        tags.push_str(&config.extra_tags);
    }
    tags
}

/// Arguments after the program name, e.g.
/// `build -o <out> -tags=libc.nofsync modernc.org/sqlite/internal/testfixture`.
pub fn build_argv(config: &BuildConfig, output: &Path) -> HarnessResult<Vec<String>> {
    let output = output.to_str().ok_or_else(|| HarnessError::Build {
        command: config.program.clone(),
        output: String::new(),
        detail: format!("output path is not valid UTF-8: {}", output.display()),
    })?;
    Ok(vec![
        "build".to_string(),
        "-o".to_string(),
        output.to_string(),
        tags_arg(config),
        config.package.clone(),
    ])
}

pub fn format_command_line(program: &str, argv: &[String]) -> String {
    let mut words = Vec::with_capacity(argv.len() + 1);
    words.push(program);
    words.extend(argv.iter().map(String::as_str));
    shell_words::join(words)
}

/// Build the fixture at `output`, running the toolchain from `cwd`.
///
/// stdout and stderr share one capture file so the build's diagnostics keep
/// their original interleaving; on failure they are reported verbatim.
pub fn build_fixture(config: &BuildConfig, output: &Path, cwd: &Path) -> HarnessResult<()> {
    let argv = build_argv(config, output)?;
    let command_line = format_command_line(&config.program, &argv);
    let build_error = |output: String, detail: String| HarnessError::Build {
        command: command_line.clone(),
        output,
        detail,
    };

    let mut capture = tempfile::tempfile()
        .map_err(|err| build_error(String::new(), format!("create output capture: {err}")))?;
    let stdout = capture
        .try_clone()
        .map_err(|err| build_error(String::new(), format!("clone output capture: {err}")))?;
    let stderr = capture
        .try_clone()
        .map_err(|err| build_error(String::new(), format!("clone output capture: {err}")))?;

    tracing::info!(command = %command_line, "building fixture");
    let start = Instant::now();
    let status = Command::new(&config.program)
        .args(&argv)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .map_err(|err| build_error(String::new(), format!("spawn {}: {err}", config.program)))?;
    let elapsed_ms = start.elapsed().as_millis();

    let (combined, capture_error) = captured_output(&mut capture);
    let detail = |summary: String| match &capture_error {
        Some(err) => format!("{summary} (build output unavailable: {err})"),
        None => summary,
    };
    tracing::info!(
        elapsed_ms,
        output_bytes = combined.len(),
        success = status.success(),
        "fixture build complete"
    );

    if !status.success() {
        return Err(build_error(combined, detail(format!("exit status {status}"))));
    }
    if !output.is_file() {
        return Err(build_error(
            combined,
            detail(format!(
                "toolchain succeeded but {} was not produced",
                output.display()
            )),
        ));
    }
    Ok(())
}

/// Rewind and read the capture; a read failure yields empty output plus the
/// error so the build failure can say why nothing was captured.
fn captured_output<R: Read + Seek>(capture: &mut R) -> (String, Option<std::io::Error>) {
    let mut bytes = Vec::new();
    let read = capture
        .seek(SeekFrom::Start(0))
        .and_then(|_| capture.read_to_end(&mut bytes));
    match read {
        Ok(_) => (String::from_utf8_lossy(&bytes).into_owned(), None),
        Err(err) => {
            tracing::warn!(error = %err, "could not read build output capture");
            (String::new(), Some(err))
        }
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
