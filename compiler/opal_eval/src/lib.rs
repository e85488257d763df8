//! Tree-walking reference interpreter for resolved Opal programs.
//!
//! # Architecture
//!
//! - [`Value`]: runtime values with value semantics (cloning is deep copy)
//! - [`Interpreter`]: frame stack, global bindings, and a flow signal for
//!   break/continue/return
//! - places ([`place`] module internals): lvalue resolution to stable
//!   mutable slots with bounds checks and map default insertion
//! - [`PrintHandler`]: stdout or captured output for tests

mod errors;
mod interp;
mod place;
mod print_handler;
mod stack;
mod value;

pub use errors::{EResult, RuntimeError};
pub use interp::Interpreter;
pub use print_handler::PrintHandler;
pub use stack::ensure_sufficient_stack;
pub use value::{default_value, render, IntValue, SubrVal, Value};
