//! Runtime configuration: store selection and event bus wiring.
//!
//! Environment resolution goes through dotenvy so a `.env` file works the
//! same as real environment variables:
//! - `REPORTFLOW_SQLITE_URL`: full SQLite URL, takes precedence
//! - `SQLITE_DB_NAME`: bare file name, wrapped as `sqlite://<name>`

use std::sync::Arc;

use crate::events::{ChannelSink, EventBus, EventSink, MemorySink, StdOutSink};
use crate::runtime::store::{ContextStore, InMemoryContextStore};

/// Which store backend a runtime should use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreType {
    InMemory,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub store: StoreType,
    pub sqlite_db_name: Option<String>,
    pub event_bus: EventBusConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            store: StoreType::InMemory,
            sqlite_db_name: Self::resolve_sqlite_db_name(None),
            event_bus: EventBusConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn new(store: StoreType, sqlite_db_name: Option<String>) -> Self {
        Self {
            store,
            sqlite_db_name: Self::resolve_sqlite_db_name(sqlite_db_name),
            event_bus: EventBusConfig::default(),
        }
    }

    fn resolve_sqlite_db_name(provided: Option<String>) -> Option<String> {
        if let Some(name) = provided {
            return Some(name);
        }
        dotenvy::dotenv().ok();
        Some(std::env::var("SQLITE_DB_NAME").unwrap_or_else(|_| "reportflow.db".to_string()))
    }

    #[must_use]
    pub fn with_event_bus(mut self, event_bus: EventBusConfig) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Build the configured store backend.
    ///
    /// For SQLite, the URL resolves as `REPORTFLOW_SQLITE_URL`, then
    /// `sqlite://<sqlite_db_name>`; the database file is created when absent.
    /// A SQLite connection failure falls back to the in-memory store with an
    /// error trace rather than refusing to start.
    pub async fn build_store(&self) -> Arc<dyn ContextStore> {
        match &self.store {
            StoreType::InMemory => Arc::new(InMemoryContextStore::new()),
            #[cfg(feature = "sqlite")]
            StoreType::Sqlite => {
                let db_url = std::env::var("REPORTFLOW_SQLITE_URL")
                    .ok()
                    .or_else(|| {
                        self.sqlite_db_name
                            .as_ref()
                            .map(|name| format!("sqlite://{name}"))
                    })
                    .unwrap_or_else(|| "sqlite://reportflow.db".to_string());
                ensure_sqlite_file(&db_url);
                match crate::runtime::store_sqlite::SqliteContextStore::connect(&db_url).await {
                    Ok(store) => Arc::new(store),
                    Err(e) => {
                        tracing::error!(
                            url = %db_url,
                            error = %e,
                            "SqliteContextStore initialization failed; falling back to in-memory"
                        );
                        Arc::new(InMemoryContextStore::new())
                    }
                }
            }
        }
    }
}

/// Ensure the underlying SQLite file exists so `connect` does not fail on a
/// fresh deployment. Errors are ignored; connect reports the real failure.
#[cfg(feature = "sqlite")]
fn ensure_sqlite_file(db_url: &str) {
    if let Some(path) = db_url.strip_prefix("sqlite://") {
        let path = path.trim();
        if !path.is_empty() {
            let p = std::path::Path::new(path);
            if let Some(parent) = p.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if !p.exists() {
                let _ = std::fs::File::create_new(p);
            }
        }
    }
}

/// Sink selection for a configured event bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkConfig {
    StdOut,
    Memory,
    Channel,
}

#[derive(Clone, Debug)]
pub struct EventBusConfig {
    pub sinks: Vec<SinkConfig>,
}

impl EventBusConfig {
    #[must_use]
    pub fn new(sinks: Vec<SinkConfig>) -> Self {
        Self { sinks }
    }

    #[must_use]
    pub fn with_stdout_only() -> Self {
        Self::new(vec![SinkConfig::StdOut])
    }

    #[must_use]
    pub fn with_memory_sink() -> Self {
        Self::new(vec![SinkConfig::StdOut, SinkConfig::Memory])
    }

    #[must_use]
    pub fn add_sink(mut self, sink: SinkConfig) -> Self {
        if !self.sinks.contains(&sink) {
            self.sinks.push(sink);
        }
        self
    }

    /// Build an [`EventBus`] with the configured sinks. A `Channel` entry
    /// also returns the receiving end for the caller to consume.
    pub fn build_event_bus(
        &self,
    ) -> (
        EventBus,
        Option<tokio::sync::mpsc::UnboundedReceiver<crate::events::EngineEvent>>,
    ) {
        let mut sinks: Vec<Box<dyn EventSink>> = Vec::new();
        let mut receiver = None;
        for sink in &self.sinks {
            match sink {
                SinkConfig::StdOut => sinks.push(Box::new(StdOutSink::default())),
                SinkConfig::Memory => sinks.push(Box::new(MemorySink::new())),
                SinkConfig::Channel => {
                    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
                    sinks.push(Box::new(ChannelSink::new(tx)));
                    receiver = Some(rx);
                }
            }
        }
        (EventBus::with_sinks(sinks), receiver)
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::with_stdout_only()
    }
}
