//! Helpers for presenting acquired tokens to resource servers.

pub mod bearer;

pub use bearer::*;
