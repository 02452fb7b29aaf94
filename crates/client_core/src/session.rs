//! Observable session flag shared by every controller.
//!
//! Controllers receive an `Arc<SessionState>` instead of reading a global, and
//! learn about log in / log out through [`SessionState::subscribe`].

use std::{
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

const SESSION_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
    ArtistsUpdated,
}

/// Persistence for the "a user session is active" flag.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<bool>;
    fn save(&self, logged_in: bool) -> Result<()>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    logged_in: AtomicBool,
}

impl MemorySessionStore {
    pub fn new(logged_in: bool) -> Self {
        Self {
            logged_in: AtomicBool::new(logged_in),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<bool> {
        Ok(self.logged_in.load(Ordering::SeqCst))
    }

    fn save(&self, logged_in: bool) -> Result<()> {
        self.logged_in.store(logged_in, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    logged_in: bool,
}

/// Stores the flag as a small JSON document.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<bool> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read session file '{}'", self.path.display())
                })
            }
        };
        let file: SessionFile = serde_json::from_str(&raw)
            .with_context(|| format!("malformed session file '{}'", self.path.display()))?;
        Ok(file.logged_in)
    }

    fn save(&self, logged_in: bool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create session directory '{}'", parent.display())
            })?;
        }
        let raw = serde_json::to_string(&SessionFile { logged_in })?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write session file '{}'", self.path.display()))
    }
}

pub struct SessionState {
    logged_in: AtomicBool,
    store: Arc<dyn SessionStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionState {
    pub fn new(store: Arc<dyn SessionStore>) -> Arc<Self> {
        let logged_in = store.load().unwrap_or_else(|err| {
            warn!("session: treating session as logged out: {err:#}");
            false
        });
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Arc::new(Self {
            logged_in: AtomicBool::new(logged_in),
            store,
            events,
        })
    }

    pub fn in_memory(logged_in: bool) -> Arc<Self> {
        Self::new(Arc::new(MemorySessionStore::new(logged_in)))
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Marks the session active and announces it, followed by an artists refresh.
    pub fn log_in(&self) {
        self.set_logged_in(true);
        info!("session: logged in");
        let _ = self.events.send(SessionEvent::LoggedIn);
        let _ = self.events.send(SessionEvent::ArtistsUpdated);
    }

    pub fn log_out(&self) {
        self.set_logged_in(false);
        info!("session: logged out");
        let _ = self.events.send(SessionEvent::LoggedOut);
    }

    pub fn notify_artists_updated(&self) {
        let _ = self.events.send(SessionEvent::ArtistsUpdated);
    }

    fn set_logged_in(&self, logged_in: bool) {
        self.logged_in.store(logged_in, Ordering::SeqCst);
        if let Err(err) = self.store.save(logged_in) {
            warn!("session: failed to persist session flag: {err:#}");
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
