//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `FrontierStatus`: the partition a frontier entry lives in (not visited / visited)
//! - `SessionStatus`: lifecycle of a crawl session from provisioning to completion

mod frontier_status;
mod session_status;

// Re-export main types
pub use frontier_status::FrontierStatus;
pub use session_status::{SessionStatus, StopReason};
