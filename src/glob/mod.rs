//! Shell-style glob matching over folder trees.

mod iterator;
mod pattern;

pub use iterator::GlobIterator;
pub use pattern::{Component, GlobPattern};
