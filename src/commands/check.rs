// src/commands/check.rs

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use super::common::{compile_files, options_for};
use crate::cli::ColorMode;
use crate::errors::{ConsoleRenderer, Severity};

/// Compile the given files and render every diagnostic.
pub fn check_files(
    files: &[PathBuf],
    tops: &[String],
    params: &[String],
    lint: bool,
    error_limit: u32,
    color: ColorMode,
) -> ExitCode {
    let options = options_for(tops, params, lint, error_limit);
    let mut compilation = compile_files(files, options);
    let diags = compilation.get_all_diagnostics();

    let use_color = match color {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stderr().is_terminal(),
    };

    let mut had_error = false;
    let stderr = std::io::stderr();
    for diag in &diags {
        if diag.severity() == Severity::Error {
            had_error = true;
        }
        let (file, text, base) = match compilation.source_for(diag.span) {
            Some(source) => (source.name.clone(), source.text.clone(), source.base),
            None => (String::from("<input>"), String::new(), 0),
        };
        // Render with file-local offsets.
        let mut local = diag.clone();
        local.span.start -= base.min(local.span.start);
        local.span.end -= base.min(local.span.end);
        let mut renderer = ConsoleRenderer::new(stderr.lock(), use_color, &file, &text);
        let _ = renderer.render(&local);
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
