//! # Held Transaction Store
//!
//! Parked transactions shared by every terminal session.
//!
//! ## Park / Retrieve Flow
//! ```text
//! Terminal A                  HeldStore                    Terminal B
//! ──────────                  ─────────                    ──────────
//! hold() ──── park(snapshot) ──► code = HLD-004217
//!                               (regenerated on collision)
//!                                     │
//!                                     │ ◄── retrieve("HLD-004217") ── retrieve
//!                                     │     check-and-remove under one lock
//!                                     ▼
//!                               Ok(snapshot)  ──────────────► cart restored
//!
//! A second retrieve of the same code gets HeldNotFound.
//! ```
//!
//! Critical sections are short and never await, so a `std::sync::Mutex` is
//! enough; the store is cheap to clone and share.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;

use crate::error::{CoreError, CoreResult};
use crate::types::{HeldSummary, HeldTransaction};
use crate::{PARK_CODE_DIGITS, PARK_CODE_PREFIX};

/// In-memory store of held transactions keyed by park code.
#[derive(Debug, Clone, Default)]
pub struct HeldStore {
    inner: Arc<Mutex<HashMap<String, HeldTransaction>>>,
}

impl HeldStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HeldTransaction>> {
        // A panic mid-insert/remove leaves the map itself consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `held` under a fresh park code and returns the code.
    ///
    /// Whatever `park_code` the caller put on `held` is replaced.
    pub fn park(&self, mut held: HeldTransaction) -> String {
        let mut map = self.lock();
        let mut rng = rand::thread_rng();

        let code = loop {
            let candidate = generate_park_code(&mut rng);
            if !map.contains_key(&candidate) {
                break candidate;
            }
        };

        held.park_code = code.clone();
        map.insert(code.clone(), held);
        code
    }

    /// Removes and returns the transaction parked under `code`.
    ///
    /// Exact match only. Fails with `HeldNotFound` if the code is unknown or
    /// was already retrieved.
    pub fn retrieve(&self, code: &str) -> CoreResult<HeldTransaction> {
        self.lock()
            .remove(code)
            .ok_or_else(|| CoreError::HeldNotFound(code.to_string()))
    }

    /// Held transactions, oldest first.
    pub fn list(&self) -> Vec<HeldSummary> {
        let map = self.lock();
        let mut entries: Vec<HeldSummary> = map.values().map(HeldSummary::from).collect();
        entries.sort_by(|a, b| a.held_at.cmp(&b.held_at).then_with(|| a.park_code.cmp(&b.park_code)));
        entries
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// `HLD-` plus zero-padded random digits, e.g. `HLD-004217`.
fn generate_park_code<R: Rng>(rng: &mut R) -> String {
    let max = 10u32.pow(PARK_CODE_DIGITS as u32);
    format!(
        "{}{:0width$}",
        PARK_CODE_PREFIX,
        rng.gen_range(0..max),
        width = PARK_CODE_DIGITS
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
