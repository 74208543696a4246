//! URL handling module for Wavecrawl
//!
//! This module provides absolute-URL validation for seeds and discovered links,
//! and origin-based resolution of hrefs found on fetched pages.

mod origin;
mod validate;

// Re-export main functions
pub use origin::{origin_of, resolve_against_origin};
pub use validate::{host_of, parse_absolute_url};
