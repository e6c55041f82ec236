//! Metrology data analysis
//!
//! Robust plane fits and residual statistics for flatness and absolute
//! height measurements of scanned sensor and raft surfaces.

pub mod cli;
pub mod core;
pub mod entities;
pub mod formats;
pub mod yaml;
