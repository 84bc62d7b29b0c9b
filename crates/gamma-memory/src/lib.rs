pub mod buffer;
pub mod snapshot;

pub use buffer::{estimate_message_tokens, estimate_tokens, MemoryStore};
pub use snapshot::{FileSnapshotStore, InMemorySnapshotStore};
