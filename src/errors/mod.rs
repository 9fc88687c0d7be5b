// src/errors/mod.rs
//! Structured diagnostic reporting for the Veris compiler.
//!
//! Semantic problems are diagnostics collected on the compilation and
//! deduplicated by (code, location); they never unwind as errors. Lexer and
//! parser failures use miette-enabled enums so the front door can render
//! rich labels, then feed the same diagnostic stream.

pub mod codes;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod render;

pub use codes::{DiagCode, Severity};
pub use diagnostic::{Diagnostic, Diagnostics};
pub use lexer::LexerError;
pub use parser::ParserError;
pub use render::ConsoleRenderer;
