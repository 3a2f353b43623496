//! Application state.
//!
//! ```text
//! AppState
//! ├── config: ServerConfig
//! ├── trainer / model_store          (shared by every session)
//! └── sessions: RwLock<HashMap<id, Arc<Session>>>
//!                                    │
//!                      Session { tables: RwLock<SessionTables> }
//!                      ├── raw:       Option<LoadedTable>   (upload)
//!                      └── processed: Option<LoadedTable>   (preprocess)
//! ```
//!
//! Sessions are keyed by the `x-session-id` header; requests without one
//! share the `"default"` session. Only an upload creates a session; every
//! other request looks its session up and answers 404 when there is none.
//! Sessions idle past `session_ttl` are dropped, and an upload that would
//! exceed `max_sessions` evicts the least recently used one.
//!
//! Tables are only ever replaced whole, under the session's write lock, and
//! handlers work on cheap `DataFrame` clones taken under the read lock.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use edalab_learning::{LearningResult, ModelStore, Trainer};
use parking_lot::{Mutex, RwLock};
use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::{ApiError, Result};

/// Request header selecting the session.
pub const SESSION_HEADER: &str = "x-session-id";

/// Session used when the header is missing or blank.
pub const DEFAULT_SESSION: &str = "default";

/// A table held by a session.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub frame: DataFrame,
    /// Name of the uploaded file the table came from.
    pub file_name: String,
    /// Session-wide counter value assigned when the table was stored.
    pub generation: u64,
    /// For processed tables, the generation of the raw table they were built from.
    pub source_generation: Option<u64>,
}

#[derive(Debug, Default)]
pub struct SessionTables {
    pub raw: Option<LoadedTable>,
    pub processed: Option<LoadedTable>,
    generation: u64,
}

fn no_data() -> ApiError {
    ApiError::NotFound("No data loaded".to_string())
}

fn no_processed_data() -> ApiError {
    ApiError::NotFound("No processed data available; run preprocessing first".to_string())
}

#[derive(Debug)]
pub struct Session {
    tables: RwLock<SessionTables>,
    last_used: Mutex<Instant>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            tables: RwLock::default(),
            last_used: Mutex::new(Instant::now()),
        }
    }
}

impl Session {
    /// The raw table, or 404.
    pub fn raw(&self) -> Result<LoadedTable> {
        self.tables.read().raw.clone().ok_or_else(no_data)
    }

    /// The processed table, or 404.
    pub fn processed(&self) -> Result<LoadedTable> {
        self.tables
            .read()
            .processed
            .clone()
            .ok_or_else(no_processed_data)
    }

    /// Raw and processed tables read under one lock, or 404 if either is missing.
    pub fn both(&self) -> Result<(LoadedTable, LoadedTable)> {
        let tables = self.tables.read();
        let raw = tables.raw.clone().ok_or_else(no_data)?;
        let processed = tables.processed.clone().ok_or_else(no_processed_data)?;
        Ok((raw, processed))
    }

    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    fn last_used(&self) -> Instant {
        *self.last_used.lock()
    }

    fn is_idle(&self, ttl: Duration) -> bool {
        self.last_used().elapsed() >= ttl
    }

    /// Store a freshly uploaded table. Any processed table is discarded.
    pub fn replace_raw(&self, frame: DataFrame, file_name: String) -> u64 {
        let mut tables = self.tables.write();
        tables.generation += 1;
        let generation = tables.generation;

        tables.raw = Some(LoadedTable {
            frame,
            file_name,
            generation,
            source_generation: None,
        });
        tables.processed = None;
        generation
    }

    /// Store a processed table built from raw generation `source_generation`.
    ///
    /// Fails with 409 when the raw table was replaced in the meantime; the
    /// session is left untouched in that case.
    pub fn commit_processed(&self, frame: DataFrame, source_generation: u64) -> Result<u64> {
        let mut tables = self.tables.write();
        let (file_name, current) = match &tables.raw {
            Some(raw) => (raw.file_name.clone(), raw.generation),
            None => {
                return Err(ApiError::Conflict(
                    "Dataset was removed while preprocessing".to_string(),
                ));
            }
        };
        if current != source_generation {
            return Err(ApiError::Conflict(
                "Dataset changed while preprocessing; run preprocessing again".to_string(),
            ));
        }

        tables.generation += 1;
        let generation = tables.generation;
        tables.processed = Some(LoadedTable {
            frame,
            file_name,
            generation,
            source_generation: Some(source_generation),
        });
        Ok(generation)
    }
}

/// Shared state handed to every handler.
pub struct AppState {
    pub config: ServerConfig,
    pub trainer: Trainer,
    pub model_store: ModelStore,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl AppState {
    /// Build the state, creating the models directory.
    pub fn new(config: ServerConfig) -> LearningResult<Self> {
        let trainer = Trainer::new(config.training_config()?)?;
        let model_store = ModelStore::open(&config.models_dir)?;
        info!(
            models_dir = %model_store.dir().display(),
            evaluation = %config.evaluation,
            "Application state ready"
        );

        Ok(Self {
            config,
            trainer,
            model_store,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// The live session named `id`, if any. Never creates one.
    ///
    /// A session found idle past the TTL is removed and reported as absent.
    pub fn find_session(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.read().get(id).cloned()?;
        if session.is_idle(self.config.session_ttl) {
            let mut sessions = self.sessions.write();
            // Another upload may have replaced it since the read
            if sessions.get(id).is_some_and(|current| Arc::ptr_eq(current, &session)) {
                sessions.remove(id);
                debug!(session = id, "Dropped idle session");
            }
            return None;
        }
        session.touch();
        Some(session)
    }

    /// The session named `id`, or 404 when no upload created it.
    pub fn existing_session(&self, id: &str) -> Result<Arc<Session>> {
        self.find_session(id).ok_or_else(no_data)
    }

    /// The raw table of session `id`, or 404.
    pub fn raw(&self, id: &str) -> Result<LoadedTable> {
        self.existing_session(id)?.raw()
    }

    /// The processed table of session `id`, or 404.
    pub fn processed(&self, id: &str) -> Result<LoadedTable> {
        self.find_session(id).ok_or_else(no_processed_data)?.processed()
    }

    /// Raw and processed tables of session `id`, or 404.
    pub fn both(&self, id: &str) -> Result<(LoadedTable, LoadedTable)> {
        self.existing_session(id)?.both()
    }

    /// The session named `id` for an upload, created when missing.
    ///
    /// Idle sessions are swept first; if the map is still full, least
    /// recently used sessions are evicted to make room.
    pub fn session_for_upload(&self, id: &str) -> Arc<Session> {
        let ttl = self.config.session_ttl;
        let mut sessions = self.sessions.write();

        sessions.retain(|key, session| {
            let keep = !session.is_idle(ttl);
            if !keep {
                debug!(session = %key, "Dropped idle session");
            }
            keep
        });

        if let Some(session) = sessions.get(id) {
            session.touch();
            return Arc::clone(session);
        }

        while sessions.len() >= self.config.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_used())
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            info!(session = %oldest, "Evicted least recently used session");
        }

        debug!(session = id, "Creating session");
        let session = Arc::new(Session::default());
        sessions.insert(id.to_string(), Arc::clone(&session));
        session
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

/// Session id taken from the [`SESSION_HEADER`] header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_SESSION);
        Ok(Self(id.to_string()))
    }
}
