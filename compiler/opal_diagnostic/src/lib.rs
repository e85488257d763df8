//! Diagnostics for the Opal compiler.
//!
//! Every failure the compiler or interpreter reports is a *located
//! message*: a severity, human-readable text, and a [`opal_ir::Span`] the
//! [`SourceMap`] turns into `<file>:<line>:<col>`. There is no recovery
//! machinery: the first error in a phase halts that phase, and the driver
//! observes a single `Result` at the top level.

mod diagnostic;
mod source;

pub use diagnostic::{Diagnostic, Severity};
pub use source::{LineOffsetTable, SourceFile, SourceMap};
