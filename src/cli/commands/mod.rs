//! CLI command implementations.

mod doctor;
mod download;
mod info;
mod mcp;

pub use doctor::run_doctor;
pub use download::run_download;
pub use info::run_info;
pub use mcp::run_mcp;
