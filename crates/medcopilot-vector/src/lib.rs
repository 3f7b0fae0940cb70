//! Exact vector index, chunk store and the persisted corpus snapshot.
pub mod index;
pub mod persist;
pub mod snapshot;
pub mod store;

pub use index::FlatL2Index;
pub use persist::{load_snapshot, remove_snapshot, write_snapshot};
pub use snapshot::{CorpusSnapshot, RetrievedChunk};
pub use store::DocumentStore;
