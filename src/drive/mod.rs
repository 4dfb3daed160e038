//! Drive gateway integration.

pub mod client;
pub mod types;

pub use client::DriveService;
pub use types::{DriveError, DriveFile};
