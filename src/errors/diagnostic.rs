// src/errors/diagnostic.rs
//! Diagnostic storage with (code, location) deduplication.

use rustc_hash::FxHashMap;

use super::codes::{DiagCode, Severity};
use crate::frontend::Span;

/// A single reported diagnostic.
///
/// Message templates in the static code table use `{}` placeholders filled
/// from `args` in order. When the same (code, location) pair is reported
/// through multiple instantiations, `multiplicity` counts the occurrences
/// and the diagnostic is rendered once.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: &'static DiagCode,
    pub span: Span,
    pub args: Vec<String>,
    pub multiplicity: u32,
}

impl Diagnostic {
    pub fn new(code: &'static DiagCode, span: Span, args: Vec<String>) -> Self {
        Self {
            code,
            span,
            args,
            multiplicity: 1,
        }
    }

    pub fn severity(&self) -> Severity {
        self.code.severity
    }

    pub fn code_string(&self) -> String {
        self.code.code_string()
    }

    /// Substitute args into the message template
    pub fn message(&self) -> String {
        let mut out = String::with_capacity(self.code.message.len());
        let mut args = self.args.iter();
        let mut rest = self.code.message;
        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            match args.next() {
                Some(a) => out.push_str(a),
                None => out.push_str("{}"),
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        if self.multiplicity > 1 {
            out.push_str(&format!(" (in {} instances)", self.multiplicity));
        }
        out
    }
}

/// Collects diagnostics for a compilation, deduplicated by (code, location).
///
/// Lazy binding means the same syntax can be visited more than once; the
/// dedup map makes re-entry harmless. The sink also enforces the error
/// limit: once `error_limit` errors have been recorded, further errors are
/// dropped and a single limit-exceeded diagnostic is appended.
#[derive(Debug)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    seen: FxHashMap<(u16, usize), usize>,
    num_errors: usize,
    error_limit: usize,
    limit_reported: bool,
}

impl Diagnostics {
    pub fn new(error_limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            seen: FxHashMap::default(),
            num_errors: 0,
            error_limit,
            limit_reported: false,
        }
    }

    /// Record a diagnostic. Returns true if this is a new (code, location)
    /// pair; false if it collapsed into an existing report.
    pub fn add(&mut self, code: &'static DiagCode, span: Span, args: Vec<String>) -> bool {
        let key = (code.code, span.start);
        if let Some(&idx) = self.seen.get(&key) {
            self.entries[idx].multiplicity += 1;
            return false;
        }

        if code.severity == Severity::Error {
            if self.limit_exceeded() {
                if !self.limit_reported {
                    self.limit_reported = true;
                    self.entries
                        .push(Diagnostic::new(&super::codes::ELAB_ERROR_LIMIT, span, vec![]));
                }
                return false;
            }
            self.num_errors += 1;
        }

        self.seen.insert(key, self.entries.len());
        self.entries.push(Diagnostic::new(code, span, args));
        true
    }

    pub fn limit_exceeded(&self) -> bool {
        self.num_errors >= self.error_limit
    }

    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Entries ordered by source location, suitable for rendering.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut out = self.entries.clone();
        out.sort_by_key(|d| (d.span.start, d.code.code));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::codes::{LOOKUP_DUPLICATE_NAME, LOOKUP_UNDEFINED_NAME};

    #[test]
    fn message_substitutes_args() {
        let d = Diagnostic::new(
            &LOOKUP_UNDEFINED_NAME,
            Span::default(),
            vec!["foo".to_string()],
        );
        assert_eq!(d.message(), "use of undeclared identifier 'foo'");
    }

    #[test]
    fn dedup_by_code_and_location() {
        let mut sink = Diagnostics::new(64);
        let span = Span::new(10, 13, 2, 1);
        assert!(sink.add(&LOOKUP_UNDEFINED_NAME, span, vec!["x".into()]));
        assert!(!sink.add(&LOOKUP_UNDEFINED_NAME, span, vec!["x".into()]));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.entries()[0].multiplicity, 2);

        // Different code at the same location is a separate entry.
        assert!(sink.add(&LOOKUP_DUPLICATE_NAME, span, vec!["x".into()]));
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn error_limit_short_circuits() {
        let mut sink = Diagnostics::new(2);
        sink.add(&LOOKUP_UNDEFINED_NAME, Span::new(0, 1, 1, 1), vec!["a".into()]);
        sink.add(&LOOKUP_UNDEFINED_NAME, Span::new(1, 2, 1, 2), vec!["b".into()]);
        assert!(sink.limit_exceeded());
        sink.add(&LOOKUP_UNDEFINED_NAME, Span::new(2, 3, 1, 3), vec!["c".into()]);
        // Two real errors plus the limit-exceeded note.
        assert_eq!(sink.len(), 3);
        assert_eq!(sink.entries()[2].code.code, 5999);
        // Further errors do not add more entries.
        sink.add(&LOOKUP_UNDEFINED_NAME, Span::new(3, 4, 1, 4), vec!["d".into()]);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn multiplicity_renders_in_message() {
        let mut sink = Diagnostics::new(64);
        let span = Span::new(5, 6, 1, 6);
        sink.add(&LOOKUP_UNDEFINED_NAME, span, vec!["y".into()]);
        sink.add(&LOOKUP_UNDEFINED_NAME, span, vec!["y".into()]);
        sink.add(&LOOKUP_UNDEFINED_NAME, span, vec!["y".into()]);
        let msg = sink.entries()[0].message();
        assert!(msg.contains("(in 3 instances)"));
    }
}
