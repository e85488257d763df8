//! Lvalue places.
//!
//! An assignable expression resolves to a [`Place`]: a storage root plus
//! a path of steps into the compound value stored there. Applying a place
//! walks `&mut Value`, bounds-checking array steps and auto-inserting map
//! defaults, and yields a stable mutable slot: the Rust rendering of an
//! lvalue reference.

use crate::value::Value;
use opal_ir::VarId;

/// Where a place's storage lives.
#[derive(Clone, Debug)]
pub enum PlaceRoot {
    /// A local binding in a specific (absolute) frame.
    Local { frame: usize, var: VarId },
    /// A global binding.
    Global(VarId),
    /// The by-value `this` slot of a frame (receiver was a temporary).
    FrameThis { frame: usize },
}

/// One step from a compound value into an element.
#[derive(Clone, Debug)]
pub enum PlaceStep {
    /// Struct data member or tuple position.
    Member(usize),
    /// Array element (bounds-checked at application).
    Index(usize),
    /// Map entry (inserted with the value type's default when absent).
    Key(Value),
}

/// A resolved lvalue.
#[derive(Clone, Debug)]
pub struct Place {
    pub root: PlaceRoot,
    pub steps: Vec<PlaceStep>,
}

impl Place {
    pub fn new(root: PlaceRoot) -> Self {
        Place { root, steps: Vec::new() }
    }
}

/// How `this` is bound in a frame: forwarding to the receiver's own
/// storage (so methods mutate their receiver), or holding a temporary by
/// value.
#[derive(Clone, Debug)]
pub enum ThisBinding {
    Place(Place),
    Value(Value),
}
