//! Output module for reporting on crawl sessions
//!
//! This module handles reading session progress back out of the database and
//! presenting it on the command line.

pub mod stats;

pub use stats::{
    load_statistics, print_sessions, print_statistics, render_statistics, SessionStatistics,
};
