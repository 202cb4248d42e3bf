use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use vrpc_core::schema::openapi::DocumentInfo;
use vrpc_core::Registry;

/// Shared state handed to every handler. The registry is read-only once
/// the server is running.
pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub registry: Registry,
    pub max_memory: u64,
    pub spool_dir: Option<PathBuf>,
    pub gzip: bool,
    pub request_timeout: Option<Duration>,
    pub document: DocumentInfo,
}
