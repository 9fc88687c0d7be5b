// src/cli/args.rs

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Color output mode
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect based on terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Veris SystemVerilog front-end
#[derive(Parser)]
#[command(name = "veris")]
#[command(version)]
#[command(about = "SystemVerilog elaboration and type checking", long_about = None)]
pub struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Elaborate and type-check source files, reporting diagnostics
    Check {
        /// Paths to SystemVerilog files
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Top module names (default: auto-detect)
        #[arg(long = "top", value_name = "MODULE")]
        tops: Vec<String>,

        /// Parameter overrides for top modules, as name=value
        #[arg(short = 'P', long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Compile in lint mode, suppressing elaboration-dependent errors
        #[arg(long)]
        lint: bool,

        /// Maximum errors before giving up
        #[arg(long, default_value_t = 64)]
        error_limit: u32,
    },
    /// Print the elaborated design tree as JSON
    Dump {
        /// Paths to SystemVerilog files
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Top module names (default: auto-detect)
        #[arg(long = "top", value_name = "MODULE")]
        tops: Vec<String>,

        /// Parameter overrides for top modules, as name=value
        #[arg(short = 'P', long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
    },
}
