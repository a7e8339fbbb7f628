//! IDE feature tests
//!
//! Tests for:
//! - Code completion
//! - Input slots
//! - Go to definition and resource references
//! - Commands through the analysis host

pub mod tests_commands;
pub mod tests_completion;
pub mod tests_input_slots;
pub mod tests_navigation;
