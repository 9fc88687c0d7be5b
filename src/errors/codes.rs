// src/errors/codes.rs
//! Diagnostic codes and metadata for the Veris compiler.
//!
//! Code numbering scheme:
//! - E0xxx: Lexer
//! - E1xxx: Parser
//! - E2xxx: Name resolution
//! - E3xxx: Types and expression binding
//! - E4xxx: Constant evaluation
//! - E5xxx: Elaboration
//! - W6xxx: Lint warnings

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// Diagnostic metadata - static definition
#[derive(Debug)]
pub struct DiagCode {
    pub code: u16,
    pub message: &'static str,
    pub severity: Severity,
    pub hint: Option<&'static str>,
}

impl DiagCode {
    /// Format code as "Exxxx" for errors or "Wxxxx" for warnings
    pub fn code_string(&self) -> String {
        let prefix = if self.severity == Severity::Warning {
            "W"
        } else {
            "E"
        };
        format!("{}{:04}", prefix, self.code)
    }
}

// =============================================================================
// Lexer (E0xxx)
// =============================================================================

pub const LEXER_UNEXPECTED_CHARACTER: DiagCode = DiagCode {
    code: 1,
    message: "unexpected character '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const LEXER_UNTERMINATED_STRING: DiagCode = DiagCode {
    code: 2,
    message: "unterminated string literal",
    severity: Severity::Error,
    hint: Some("add a closing '\"' to terminate the string"),
};

pub const LEXER_UNTERMINATED_COMMENT: DiagCode = DiagCode {
    code: 3,
    message: "unterminated block comment",
    severity: Severity::Error,
    hint: None,
};

pub const LEXER_INVALID_NUMBER: DiagCode = DiagCode {
    code: 5,
    message: "invalid number literal",
    severity: Severity::Error,
    hint: None,
};

// =============================================================================
// Parser (E1xxx)
// =============================================================================

pub const PARSER_EXPECTED_TOKEN: DiagCode = DiagCode {
    code: 1001,
    message: "expected '{}', found '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const PARSER_EXPECTED_EXPRESSION: DiagCode = DiagCode {
    code: 1002,
    message: "expected expression, found '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const PARSER_UNEXPECTED_TOKEN: DiagCode = DiagCode {
    code: 1003,
    message: "unexpected token '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const PARSER_EXPECTED_TYPE: DiagCode = DiagCode {
    code: 1004,
    message: "expected data type, found '{}'",
    severity: Severity::Error,
    hint: None,
};

// =============================================================================
// Name resolution (E2xxx)
// =============================================================================

pub const LOOKUP_UNDEFINED_NAME: DiagCode = DiagCode {
    code: 2001,
    message: "use of undeclared identifier '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const LOOKUP_USED_BEFORE_DECLARED: DiagCode = DiagCode {
    code: 2002,
    message: "'{}' is used before its declaration",
    severity: Severity::Error,
    hint: None,
};

pub const LOOKUP_DUPLICATE_NAME: DiagCode = DiagCode {
    code: 2003,
    message: "'{}' is already declared in this scope",
    severity: Severity::Error,
    hint: None,
};

pub const LOOKUP_AMBIGUOUS_IMPORT: DiagCode = DiagCode {
    code: 2004,
    message: "'{}' is ambiguous; imported from multiple packages",
    severity: Severity::Error,
    hint: None,
};

pub const LOOKUP_HIERARCHICAL_NOT_ALLOWED: DiagCode = DiagCode {
    code: 2005,
    message: "hierarchical reference to '{}' is not allowed in a constant expression",
    severity: Severity::Error,
    hint: None,
};

pub const LOOKUP_UNKNOWN_PACKAGE: DiagCode = DiagCode {
    code: 2006,
    message: "unknown package '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const LOOKUP_NOT_A_SCOPE: DiagCode = DiagCode {
    code: 2007,
    message: "'{}' is not a scope; cannot resolve '{}' inside it",
    severity: Severity::Error,
    hint: None,
};

pub const LOOKUP_UNKNOWN_MEMBER: DiagCode = DiagCode {
    code: 2008,
    message: "no member named '{}' in '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const LOOKUP_UNKNOWN_SYSTEM_NAME: DiagCode = DiagCode {
    code: 2009,
    message: "unknown system function or task '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const LOOKUP_SUGGEST_SPELLING: DiagCode = DiagCode {
    code: 2010,
    message: "use of undeclared identifier '{}'; did you mean '{}'?",
    severity: Severity::Error,
    hint: None,
};

// =============================================================================
// Types and expression binding (E3xxx)
// =============================================================================

pub const BIND_TYPE_MISMATCH: DiagCode = DiagCode {
    code: 3001,
    message: "cannot convert from '{}' to '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_BAD_OPERANDS: DiagCode = DiagCode {
    code: 3002,
    message: "invalid operands of types '{}' and '{}' to operator '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_NOT_A_VALUE: DiagCode = DiagCode {
    code: 3003,
    message: "'{}' does not refer to a value",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_INVALID_CONCAT: DiagCode = DiagCode {
    code: 3004,
    message: "type '{}' cannot appear in a concatenation",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_INVALID_SELECT: DiagCode = DiagCode {
    code: 3005,
    message: "cannot select from a value of type '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_CALL_ARG_COUNT: DiagCode = DiagCode {
    code: 3006,
    message: "expected {} arguments to '{}', found {}",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_NOT_ASSIGNABLE: DiagCode = DiagCode {
    code: 3007,
    message: "expression is not assignable",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_REVERSED_RANGE: DiagCode = DiagCode {
    code: 3008,
    message: "part-select range is reversed with respect to the declared range",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_NOT_CALLABLE: DiagCode = DiagCode {
    code: 3009,
    message: "'{}' is not a function",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_BAD_UNARY_OPERAND: DiagCode = DiagCode {
    code: 3010,
    message: "invalid operand of type '{}' to unary operator '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_DIMS_ON_NON_INTEGRAL: DiagCode = DiagCode {
    code: 3011,
    message: "type '{}' cannot have packed dimensions",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_NOT_A_TYPE: DiagCode = DiagCode {
    code: 3012,
    message: "'{}' is not a type",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_PATTERN_NO_CONTEXT: DiagCode = DiagCode {
    code: 3013,
    message: "assignment pattern requires an assignment-like context",
    severity: Severity::Error,
    hint: None,
};

pub const BIND_PATTERN_COUNT: DiagCode = DiagCode {
    code: 3014,
    message: "expected {} elements in assignment pattern, found {}",
    severity: Severity::Error,
    hint: None,
};

// =============================================================================
// Constant evaluation (E4xxx)
// =============================================================================

pub const EVAL_NOT_CONSTANT: DiagCode = DiagCode {
    code: 4001,
    message: "reference to '{}' is not allowed in a constant expression",
    severity: Severity::Error,
    hint: None,
};

pub const EVAL_STEPS_EXCEEDED: DiagCode = DiagCode {
    code: 4002,
    message: "constant expression evaluation limit exceeded",
    severity: Severity::Error,
    hint: Some("an infinite loop is likely; the limit is configurable with max_consteval_steps"),
};

pub const EVAL_RECURSION: DiagCode = DiagCode {
    code: 4003,
    message: "recursion limit exceeded while evaluating constant function '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const EVAL_NOT_CONSTANT_CONSTRUCT: DiagCode = DiagCode {
    code: 4004,
    message: "{} is not allowed in a constant expression",
    severity: Severity::Error,
    hint: None,
};

// =============================================================================
// Elaboration (E5xxx)
// =============================================================================

pub const ELAB_UNKNOWN_MODULE: DiagCode = DiagCode {
    code: 5001,
    message: "unknown module, interface, or program '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const ELAB_MAX_INSTANCE_DEPTH: DiagCode = DiagCode {
    code: 5002,
    message: "maximum instance depth exceeded while elaborating '{}'",
    severity: Severity::Error,
    hint: Some("a module probably instantiates itself; see max_instance_depth"),
};

pub const ELAB_MAX_GENERATE_STEPS: DiagCode = DiagCode {
    code: 5003,
    message: "maximum generate steps exceeded",
    severity: Severity::Error,
    hint: Some("a generate loop probably fails to terminate; see max_generate_steps"),
};

pub const ELAB_DEFPARAM_STEPS: DiagCode = DiagCode {
    code: 5004,
    message: "defparam resolution did not converge",
    severity: Severity::Error,
    hint: Some("defparam values form a cycle; see max_defparam_steps"),
};

pub const ELAB_DUPLICATE_DEFINITION: DiagCode = DiagCode {
    code: 5005,
    message: "duplicate definition of '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const ELAB_UNKNOWN_PARAM: DiagCode = DiagCode {
    code: 5006,
    message: "'{}' has no parameter named '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const ELAB_UNKNOWN_PORT: DiagCode = DiagCode {
    code: 5007,
    message: "'{}' has no port named '{}'",
    severity: Severity::Error,
    hint: None,
};

pub const ELAB_TOO_MANY_CONNECTIONS: DiagCode = DiagCode {
    code: 5008,
    message: "too many {} connections to '{}': expected at most {}",
    severity: Severity::Error,
    hint: None,
};

pub const ELAB_PARAM_NO_VALUE: DiagCode = DiagCode {
    code: 5009,
    message: "parameter '{}' has no default and no override value",
    severity: Severity::Error,
    hint: None,
};

pub const ELAB_BAD_OVERRIDE: DiagCode = DiagCode {
    code: 5010,
    message: "invalid parameter override '{}'",
    severity: Severity::Error,
    hint: Some("overrides take the form name=value"),
};

pub const ELAB_ERROR_LIMIT: DiagCode = DiagCode {
    code: 5999,
    message: "error limit exceeded; stopping",
    severity: Severity::Error,
    hint: Some("raise the limit with the error_limit option to see more"),
};

// =============================================================================
// Lint warnings (W6xxx)
// =============================================================================

pub const LINT_UNUSED_DEFINITION: DiagCode = DiagCode {
    code: 6001,
    message: "definition '{}' is never instantiated and is not a top module",
    severity: Severity::Warning,
    hint: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_string_formats() {
        assert_eq!(LOOKUP_UNDEFINED_NAME.code_string(), "E2001");
        assert_eq!(LINT_UNUSED_DEFINITION.code_string(), "W6001");
    }
}
