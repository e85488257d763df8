//! The diagnostic type and its constructors.

use crate::SourceMap;
use opal_ir::Span;

/// How severe a diagnostic is.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    /// A user error: bad source code or a failing runtime check.
    Error,
    /// An internal invariant violation: a bug in the compiler itself.
    Ice,
}

/// A located message. All compile-time and run-time failures surface as
/// one of these.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    /// A user-facing error at `span`.
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }

    /// An internal invariant violation located at the offending node.
    pub fn ice(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Ice,
            message: message.into(),
            span,
        }
    }

    /// Render as `<file>:<line>:<col>: error: <text>`.
    pub fn render(&self, sources: &SourceMap) -> String {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Ice => "internal compiler error",
        };
        match sources.locate(self.span.start) {
            Some((file, line, col)) => {
                format!("{file}:{line}:{col}: {prefix}: {}", self.message)
            }
            None => format!("{prefix}: {}", self.message),
        }
    }

    /// Render and write to standard error.
    pub fn emit(&self, sources: &SourceMap) {
        eprintln!("{}", self.render(sources));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_location_prefix() {
        let mut sources = SourceMap::new();
        let base = sources.add_file("demo.opal", "abc\ndef\n".to_string());
        let diag = Diagnostic::error(Span::new(base + 4, base + 5), "bad thing");
        assert_eq!(diag.render(&sources), "demo.opal:2:1: error: bad thing");
    }

    #[test]
    fn renders_without_location_for_dummy_span() {
        let sources = SourceMap::new();
        let diag = Diagnostic::error(Span::DUMMY, "no source");
        assert_eq!(diag.render(&sources), "error: no source");
    }
}
