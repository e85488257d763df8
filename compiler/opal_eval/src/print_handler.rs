//! Print output destinations.
//!
//! `print` writes through a handler so tests (and any embedder) can
//! capture output instead of touching the process stdout. Enum dispatch
//! keeps the hot path free of trait objects.

use std::io::Write;

/// Where rendered `print` output goes.
pub enum PrintHandler {
    /// Line-buffered standard output.
    Stdout,
    /// In-memory capture, used by tests.
    Buffer(String),
}

impl PrintHandler {
    pub fn stdout() -> Self {
        PrintHandler::Stdout
    }

    pub fn buffer() -> Self {
        PrintHandler::Buffer(String::new())
    }

    pub fn print(&mut self, text: &str) {
        match self {
            PrintHandler::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            PrintHandler::Buffer(buf) => buf.push_str(text),
        }
    }

    /// Captured output; empty for stdout.
    pub fn output(&self) -> &str {
        match self {
            PrintHandler::Stdout => "",
            PrintHandler::Buffer(buf) => buf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_captures_in_order() {
        let mut handler = PrintHandler::buffer();
        handler.print("a");
        handler.print("bc");
        assert_eq!(handler.output(), "abc");
    }
}
