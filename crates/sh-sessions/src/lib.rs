//! The bounded session store (component C6, spec §4.C6): a keyed,
//! in-memory store of conversation histories with idle eviction and an
//! LRU cap, plus the periodic sweep task that drives idle eviction.

pub mod store;
pub mod sweep;

pub use store::SessionStore;
pub use sweep::spawn_idle_sweep;
