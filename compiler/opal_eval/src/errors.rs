//! Runtime error constructors.
//!
//! Every failure the interpreter can hit is a located message built by
//! one of these, so wording stays in one place.

use opal_diagnostic::Diagnostic;
use opal_ir::Span;

/// A located runtime failure; halts execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeError {
    pub span: Span,
    pub message: String,
}

pub type EResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    fn new(span: Span, message: String) -> Self {
        RuntimeError { span, message }
    }
}

impl From<RuntimeError> for Diagnostic {
    fn from(err: RuntimeError) -> Diagnostic {
        Diagnostic::error(err.span, err.message)
    }
}

pub fn ice(span: Span, detail: &str) -> RuntimeError {
    RuntimeError::new(span, format!("internal interpreter error: {detail}"))
}

pub fn index_out_of_bounds(span: Span, index: u64, len: usize) -> RuntimeError {
    RuntimeError::new(span, format!("array index {index} out of bound {len}"))
}

pub fn negative_index(span: Span) -> RuntimeError {
    RuntimeError::new(span, "negative array index".to_string())
}

pub fn division_by_zero(span: Span) -> RuntimeError {
    RuntimeError::new(span, "integer division by zero".to_string())
}

pub fn negation_overflow(span: Span) -> RuntimeError {
    RuntimeError::new(
        span,
        "negating the minimum value of a signed integer type overflows".to_string(),
    )
}

pub fn assertion_failed(span: Span) -> RuntimeError {
    RuntimeError::new(span, "assertion failed".to_string())
}

pub fn union_as_mismatch(span: Span) -> RuntimeError {
    RuntimeError::new(
        span,
        "union value does not have the type expected by \"as\"".to_string(),
    )
}

pub fn extern_not_implemented(span: Span, name: &str) -> RuntimeError {
    RuntimeError::new(
        span,
        format!("call of external subroutine {name} is not implemented by the interpreter"),
    )
}

pub fn missing_return(span: Span) -> RuntimeError {
    RuntimeError::new(
        span,
        "reached the end of a subroutine without a return value".to_string(),
    )
}

pub fn no_default_value(span: Span, ty: &str) -> RuntimeError {
    RuntimeError::new(span, format!("type {ty} has no default value"))
}

pub fn int_conversion_overflow(span: Span, ty: &str) -> RuntimeError {
    RuntimeError::new(span, format!("integer overflow converting to {ty}"))
}

pub fn not_an_enum_value(span: Span, value: i128, name: &str) -> RuntimeError {
    RuntimeError::new(span, format!("{value} is not a value of enum {name}"))
}

pub fn negative_array_size(span: Span) -> RuntimeError {
    RuntimeError::new(span, "array dimension is negative".to_string())
}

pub fn negative_shift(span: Span) -> RuntimeError {
    RuntimeError::new(span, "shift by a negative amount".to_string())
}
