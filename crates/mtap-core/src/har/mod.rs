//! HAR (HTTP Archive) source: replay a recorded browsing session as network
//! observations.
//!
//! Pages become contexts in file order (first page is context 1). Entries
//! without a `pageref` are attributed to the unknown context.

mod parse;
mod replay;

pub use replay::{load_har, HarCapture, HarHost};
