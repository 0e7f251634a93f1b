//! The function-under-test model: a parsed, normalized representation of one
//! exported function, read-only once produced by the upstream API explorer.

mod function;

pub use function::{normalize, sanitize, FunctionUnderTest};
