//! CLI command implementations

pub mod abs_height;
pub mod completions;
pub mod delta;
pub mod flatness;
pub mod report;
