// src/errors/parser.rs
//! Parser errors (E1xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("expected '{expected}', found '{found}'")]
    #[diagnostic(code(E1001))]
    ExpectedToken {
        expected: String,
        found: String,
        #[label("expected '{expected}' here")]
        span: SourceSpan,
    },

    #[error("expected expression, found '{found}'")]
    #[diagnostic(code(E1002))]
    ExpectedExpression {
        found: String,
        #[label("expected expression")]
        span: SourceSpan,
    },

    #[error("unexpected token '{token}'")]
    #[diagnostic(code(E1003))]
    UnexpectedToken {
        token: String,
        #[label("not valid here")]
        span: SourceSpan,
    },

    #[error("expected data type, found '{found}'")]
    #[diagnostic(code(E1004))]
    ExpectedType {
        found: String,
        #[label("expected a data type")]
        span: SourceSpan,
    },
}

impl ParserError {
    pub fn span(&self) -> SourceSpan {
        match self {
            ParserError::ExpectedToken { span, .. }
            | ParserError::ExpectedExpression { span, .. }
            | ParserError::UnexpectedToken { span, .. }
            | ParserError::ExpectedType { span, .. } => *span,
        }
    }
}
