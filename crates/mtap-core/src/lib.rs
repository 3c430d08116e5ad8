pub mod config;
pub mod logging;

pub mod cache;
pub mod capture;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod gate;
pub mod har;
pub mod host;
pub mod persist;
pub mod record;

pub use capture::{CaptureService, CaptureServiceBuilder, CaptureStats};
pub use error::CaptureError;
