// src/commands/common.rs

use std::fs;
use std::path::PathBuf;

use crate::sema::{Compilation, CompilationOptions};

/// Read every file and feed it to a fresh compilation. Unreadable files
/// are reported on stderr and skipped.
pub fn compile_files(files: &[PathBuf], options: CompilationOptions) -> Compilation {
    let mut compilation = Compilation::new(options);
    for path in files {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("error: could not read '{}': {}", path.display(), e);
                continue;
            }
        };
        let name = path.to_string_lossy();
        let _ = compilation.add_source(&name, &text);
    }
    compilation
}

pub fn options_for(tops: &[String], params: &[String], lint: bool, error_limit: u32) -> CompilationOptions {
    CompilationOptions {
        top_modules: tops.to_vec(),
        param_overrides: params.to_vec(),
        lint_mode: lint,
        error_limit,
        ..CompilationOptions::default()
    }
}
