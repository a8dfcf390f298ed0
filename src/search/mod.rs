pub mod backend;
pub mod fs_index;
pub mod manager;
pub mod session;
pub mod sorting;
pub mod store;
pub mod tags;
pub mod types;

pub use backend::{HitStream, KeywordQuery, MemoryBackend, Predicate, QueryBackend};
pub use fs_index::FsIndexBackend;
pub use manager::dispatch::{SerialDispatcher, UiDispatcher, UiJob};
pub use manager::{PageCursor, PageDelivery, SearchCoordinator};
pub use session::{SessionState, SessionStatus};
pub use store::FrequencyStore;
pub use tags::{NoTags, TagLookup, TagMap};
pub use types::*;
