//! Shared application state passed to every API handler.

use std::sync::Arc;

use sh_actor::ActorClient;
use sh_domain::clock::Clock;
use sh_domain::config::Config;
use sh_providers::LazyProviderRegistry;
use sh_sessions::SessionStore;
use sh_store::{Cache, DocumentStore};
use sh_tools::Dispatcher;

use crate::runtime::cancel::CancelMap;
use crate::runtime::session_lock::SessionLockMap;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,

    pub sessions: Arc<SessionStore>,
    pub session_locks: Arc<SessionLockMap>,
    pub cancel_map: Arc<CancelMap>,

    pub store: Arc<dyn DocumentStore>,
    pub cache: Arc<Cache>,
    pub actor: Arc<dyn ActorClient>,
    pub dispatcher: Arc<Dispatcher>,
    pub tool_defs: Arc<Vec<sh_domain::tool::ToolDefinition>>,

    pub providers: Arc<LazyProviderRegistry>,
}
