//! Type system for the Opal compiler.
//!
//! Types are owned by an interning [`TypePool`]: structural types (tuple,
//! array, map, callable, union) dedup to one handle per structure, nominal
//! types (struct, enum, alias) get one handle per declaration. The pool
//! also hosts the conversion predicate, integer fit checks, and default
//! value construction.

mod convert;
mod data;
mod default;
mod pool;

pub use convert::{int_fits, sign_extend, wrap_to_width};
pub use data::{AliasDef, EnumDef, EnumItem, IntWidth, StructDef, StructField, TypeData};
pub use pool::TypePool;
