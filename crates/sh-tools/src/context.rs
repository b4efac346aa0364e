//! Everything a tool handler needs to do its work (component C5/C11).
//!
//! Handlers never see a raw `reqwest`/store client directly — only this
//! bundle, so tests can swap in `MockActorClient` / `MemoryDocumentStore`
//! without touching handler code.

use std::sync::Arc;

use sh_actor::ActorClient;
use sh_domain::clock::Clock;
use sh_store::{Cache, DocumentStore};

#[derive(Clone)]
pub struct ToolContext {
    pub cache: Arc<Cache>,
    pub actor: Arc<dyn ActorClient>,
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
}
