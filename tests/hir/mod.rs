//! Compilation tests
//!
//! Tests for:
//! - Diagnostics of broken programs
//! - Resource resolution and auto-binding

pub mod tests_diagnostics;
pub mod tests_resources;
