//! AWS endpoint access
//!
//! - [`http`] - HTTP transport (GET text, GET JSON, HEAD probe)
//! - [`directory`] - Service reference directory and structured per-service JSON

pub mod directory;
pub mod http;
