// src/errors/lexer.rs
//! Lexer errors (E0xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum LexerError {
    #[error("unexpected character '{ch}'")]
    #[diagnostic(code(E0001))]
    UnexpectedCharacter {
        ch: char,
        #[label("not valid here")]
        span: SourceSpan,
    },

    #[error("unterminated string literal")]
    #[diagnostic(code(E0002), help("add a closing '\"' to terminate the string"))]
    UnterminatedString {
        #[label("string starts here")]
        span: SourceSpan,
    },

    #[error("unterminated block comment")]
    #[diagnostic(code(E0003))]
    UnterminatedComment {
        #[label("comment starts here")]
        span: SourceSpan,
    },

    #[error("invalid number literal")]
    #[diagnostic(code(E0005))]
    InvalidNumber {
        #[label("cannot be parsed as a number")]
        span: SourceSpan,
    },
}

impl LexerError {
    pub fn span(&self) -> SourceSpan {
        match self {
            LexerError::UnexpectedCharacter { span, .. }
            | LexerError::UnterminatedString { span }
            | LexerError::UnterminatedComment { span }
            | LexerError::InvalidNumber { span } => *span,
        }
    }
}
