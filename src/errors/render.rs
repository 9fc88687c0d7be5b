// src/errors/render.rs
//! Terminal rendering for the diagnostic stream.
//!
//! Output is location-first: every diagnostic gets one `file:line:col`
//! summary line, then the offending source line in a numbered gutter with
//! the span marked underneath. Each diagnostic is assembled into a buffer
//! and written in one call so interleaved writers don't tear lines apart.

use std::io::Write;

use super::codes::Severity;
use super::diagnostic::Diagnostic;

const RED: &str = "\x1b[31;1m";
const YELLOW: &str = "\x1b[33;1m";
const BLUE: &str = "\x1b[34;1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Renders diagnostics against one source file.
pub struct ConsoleRenderer<W: Write> {
    writer: W,
    color: bool,
    file: String,
    lines: Vec<String>,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(writer: W, color: bool, file: &str, source: &str) -> Self {
        Self {
            writer,
            color,
            file: file.to_string(),
            lines: source.lines().map(str::to_string).collect(),
        }
    }

    fn paint(&self, style: &'static str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", style, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn severity_parts(severity: Severity) -> (&'static str, &'static str) {
        match severity {
            Severity::Error => ("error", RED),
            Severity::Warning => ("warning", YELLOW),
            Severity::Note => ("note", BLUE),
        }
    }

    /// Render one diagnostic: summary line, source excerpt, hint footer.
    pub fn render(&mut self, diag: &Diagnostic) -> std::io::Result<()> {
        let (label, style) = Self::severity_parts(diag.severity());
        let tag = format!("{}[{}]", label, diag.code_string());

        let mut out = String::new();
        out.push_str(&format!(
            "{}:{}:{}: {}: {}\n",
            self.file,
            diag.span.line,
            diag.span.column,
            self.paint(style, &tag),
            diag.message()
        ));
        self.push_excerpt(&mut out, diag, style);
        if let Some(hint) = diag.code.hint {
            out.push_str(&format!("  {} {}\n", self.paint(BLUE, "hint:"), hint));
        }
        out.push('\n');

        self.writer.write_all(out.as_bytes())
    }

    // The offending line in a numbered gutter. Errors are marked with
    // carets, warnings with a squiggle, so the two scan differently.
    fn push_excerpt(&self, out: &mut String, diag: &Diagnostic, style: &'static str) {
        let Some(line) = self.lines.get(diag.span.line.saturating_sub(1) as usize) else {
            return;
        };
        let number = diag.span.line.to_string();
        let bar = self.paint(DIM, "|");
        let lead = diag.span.column.saturating_sub(1) as usize;
        let span_len = diag
            .span
            .end
            .saturating_sub(diag.span.start)
            .clamp(1, line.len().saturating_sub(lead).max(1));
        let mark = if diag.severity() == Severity::Warning {
            "~"
        } else {
            "^"
        };

        out.push_str(&format!(
            " {} {} {}\n",
            self.paint(DIM, &number),
            bar,
            line
        ));
        out.push_str(&format!(
            " {} {} {}{}\n",
            " ".repeat(number.len()),
            bar,
            " ".repeat(lead),
            self.paint(style, &mark.repeat(span_len))
        ));
    }

    /// Render every diagnostic in order.
    pub fn render_all(&mut self, diags: &[Diagnostic]) -> std::io::Result<()> {
        for diag in diags {
            self.render(diag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::codes::{LINT_UNUSED_DEFINITION, LOOKUP_UNDEFINED_NAME};
    use crate::frontend::Span;

    #[test]
    fn location_first_summary_with_marked_span() {
        let source = "module m;\n  assign y = x;\nendmodule\n";
        let mut out = Vec::new();
        {
            let mut renderer = ConsoleRenderer::new(&mut out, false, "m.sv", source);
            let diag = Diagnostic::new(
                &LOOKUP_UNDEFINED_NAME,
                Span::new(23, 24, 2, 14),
                vec!["x".into()],
            );
            renderer.render(&diag).unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("m.sv:2:14: error[E2001]:"));
        assert!(text.contains("use of undeclared identifier 'x'"));
        assert!(text.contains(" 2 | "));
        assert!(text.contains("assign y = x;"));
        assert!(text.contains("^"));
        assert!(!text.contains("~"));
    }

    #[test]
    fn warnings_use_a_squiggle() {
        let source = "module dead; endmodule\n";
        let mut out = Vec::new();
        {
            let mut renderer = ConsoleRenderer::new(&mut out, false, "d.sv", source);
            let diag = Diagnostic::new(
                &LINT_UNUSED_DEFINITION,
                Span::new(7, 11, 1, 8),
                vec!["dead".into()],
            );
            renderer.render(&diag).unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("d.sv:1:8: warning[W6001]:"));
        assert!(text.contains("~~~~"));
        assert!(!text.contains("^"));
    }

    #[test]
    fn color_stays_off_unless_asked() {
        let mut out = Vec::new();
        {
            let mut renderer = ConsoleRenderer::new(&mut out, false, "a.sv", "x\n");
            let diag = Diagnostic::new(&LOOKUP_UNDEFINED_NAME, Span::new(0, 1, 1, 1), vec![
                "x".into(),
            ]);
            renderer.render(&diag).unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains('\x1b'));
    }
}
