// src/commands/dump.rs

use std::path::PathBuf;
use std::process::ExitCode;

use super::common::{compile_files, options_for};

/// Compile and print the elaborated design tree as JSON.
pub fn dump_files(files: &[PathBuf], tops: &[String], params: &[String]) -> ExitCode {
    let options = options_for(tops, params, false, 64);
    let mut compilation = compile_files(files, options);
    let tree = compilation.serialize_design();
    match serde_json::to_string_pretty(&tree) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: could not serialize design: {}", e);
            ExitCode::FAILURE
        }
    }
}
