//! # Application State
//!
//! Shared state handed to every handler.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  AppState (Clone, cheap)                                                │
//! │  ├── db: Database           pool shared by all terminals                │
//! │  ├── held: HeldStore        one parking lot for the whole store         │
//! │  ├── config: Arc<AppConfig> read-only after startup                     │
//! │  └── sessions                                                           │
//! │        "lane-1" ──► Arc<tokio::Mutex<Checkout>>                         │
//! │        "lane-2" ──► Arc<tokio::Mutex<Checkout>>                         │
//! │                                                                         │
//! │  THREAD SAFETY:                                                         │
//! │  • One checkout lock per terminal: requests from the same terminal      │
//! │    run one at a time, other terminals are not blocked                   │
//! │  • The session map lock is never held across an await                   │
//! │  • A held transaction parked on lane-1 can be retrieved on lane-2       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Eviction
//! Opening a session first drops sessions unused for `config.session_idle`.
//! A session survives while a request holds it or its cart has lines.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use strata_core::{Checkout, HeldStore};
use strata_db::Database;

const MAX_TERMINAL_ID_LEN: usize = 64;

/// One terminal's checkout, locked for the duration of a request.
pub type Session = Arc<AsyncMutex<Checkout>>;

#[derive(Debug)]
struct SessionSlot {
    session: Session,
    last_used: Instant,
}

impl SessionSlot {
    /// Idle long enough, not in use by a request, and nothing in the cart.
    fn evictable(&self, now: Instant, idle: Duration) -> bool {
        if now.saturating_duration_since(self.last_used) < idle || Arc::strong_count(&self.session) > 1 {
            return false;
        }
        self.session
            .try_lock()
            .map(|checkout| checkout.cart().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub held: HeldStore,
    pub config: Arc<AppConfig>,
    sessions: Arc<Mutex<HashMap<String, SessionSlot>>>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState {
            db,
            held: HeldStore::new(),
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the terminal's session, opening one on first use.
    ///
    /// Terminal ids are 1-64 characters of letters, digits, `-` or `_`.
    pub fn session(&self, terminal: &str) -> ApiResult<Session> {
        validate_terminal_id(terminal)?;

        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        evict_idle(&mut sessions, now, self.config.session_idle);

        let slot = sessions.entry(terminal.to_string()).or_insert_with(|| {
            let checkout = Checkout::new(self.held.clone(), self.config.loyalty);
            info!(
                terminal,
                transaction_number = checkout.transaction_number(),
                "Terminal session opened"
            );
            SessionSlot {
                session: Arc::new(AsyncMutex::new(checkout)),
                last_used: now,
            }
        });
        slot.last_used = now;

        Ok(slot.session.clone())
    }

    /// Drops idle sessions now; returns how many were dropped.
    pub fn evict_idle_sessions(&self) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        evict_idle(&mut sessions, Instant::now(), self.config.session_idle)
    }

    /// Number of terminals with an open session.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn evict_idle(
    sessions: &mut HashMap<String, SessionSlot>,
    now: Instant,
    idle: Duration,
) -> usize {
    let before = sessions.len();
    sessions.retain(|terminal, slot| {
        let evict = slot.evictable(now, idle);
        if evict {
            debug!(terminal = %terminal, "Idle terminal session closed");
        }
        !evict
    });
    before - sessions.len()
}

fn validate_terminal_id(terminal: &str) -> ApiResult<()> {
    let valid = !terminal.is_empty()
        && terminal.len() <= MAX_TERMINAL_ID_LEN
        && terminal
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "terminal id must be 1-{} letters, digits, '-' or '_'",
            MAX_TERMINAL_ID_LEN
        )))
    }
}
