//! Sequence coordinate resolution and session persistence.

mod cache;
mod store;

pub use cache::SequenceCache;
pub use store::{ActiveSequence, FileSession, MemSession, SessionStore};
