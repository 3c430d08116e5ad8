//! Persistence: save debounce policy and storage backends.

mod policy;
mod storage;

pub use policy::{SaveAction, SavePolicy, SaveState};
pub use storage::{FileStorage, MemoryStorage, Storage};
