//! Request handlers for note operations.

mod notes;

pub use notes::*;
