//! Request handlers.

mod provision;

pub use provision::*;
