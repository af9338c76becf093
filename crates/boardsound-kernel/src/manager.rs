//! Output context ownership and recovery.
//!
//! The manager holds the single live [`AudioContext`] and a registry of every
//! [`GainNode`] handed out. Platforms tear contexts down behind our back
//! (device loss, interruptions, unknown vendor states), so every consumer goes
//! through [`AudioContextManager::reconcile`] before touching the context. When
//! the held context is dead, reconciliation builds a fresh one and reconnects
//! every registered gain node to it under the same lock, so no caller can
//! observe the new context with stale wiring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use boardsound_common::{ContextId, SoundError, SoundResult};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::context::{AudioContext, ContextFactory, ContextHealth, ContextState, GainNode};

/// Owner of the process-wide output context.
pub struct AudioContextManager {
    factory: Arc<dyn ContextFactory>,
    current: RwLock<Arc<dyn AudioContext>>,
    gains: Mutex<Vec<Weak<GainNode>>>,
    replacements: AtomicU64,
}

impl std::fmt::Debug for AudioContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioContextManager")
            .field("current", &self.current.read().id())
            .field("replacements", &self.replacements())
            .finish_non_exhaustive()
    }
}

impl AudioContextManager {
    /// Opens the initial context through `factory`.
    pub fn new(factory: Arc<dyn ContextFactory>) -> SoundResult<Self> {
        let initial = factory.create()?;
        info!("Audio context {} opened ({})", initial.id(), initial.state());

        Ok(Self {
            factory,
            current: RwLock::new(initial),
            gains: Mutex::new(Vec::new()),
            replacements: AtomicU64::new(0),
        })
    }

    /// The held context, without reconciliation.
    #[must_use]
    pub fn context(&self) -> Arc<dyn AudioContext> {
        Arc::clone(&self.current.read())
    }

    /// State of the held context.
    #[must_use]
    pub fn state(&self) -> ContextState {
        self.current.read().state()
    }

    /// Number of times a dead context was replaced.
    #[must_use]
    pub fn replacements(&self) -> u64 {
        self.replacements.load(Ordering::Relaxed)
    }

    /// Creates a gain node connected to the current context and registers it
    /// for rewiring on replacement.
    pub fn create_gain(&self) -> Arc<GainNode> {
        // Hold the read lock so a concurrent replacement cannot slip between
        // connecting and registering.
        let current = self.current.read();
        let gain = Arc::new(GainNode::new());
        gain.connect(current.id());

        let mut gains = self.gains.lock();
        prune(&mut gains);
        gains.push(Arc::downgrade(&gain));
        gain
    }

    /// Number of gain nodes currently registered for rewiring.
    #[must_use]
    pub fn registered_gains(&self) -> usize {
        self.gains.lock().len()
    }

    /// Returns a context that is running or suspended, replacing a dead one.
    ///
    /// Idempotent: a healthy context is returned untouched.
    pub fn reconcile(&self) -> SoundResult<Arc<dyn AudioContext>> {
        {
            let current = self.current.read();
            if current.state().health() != ContextHealth::Dead {
                return Ok(Arc::clone(&current));
            }
        }

        let mut current = self.current.write();
        let state = current.state();
        if state.health() != ContextHealth::Dead {
            // Replaced by another caller while we waited for the lock.
            return Ok(Arc::clone(&current));
        }

        // Interrupted contexts belong to the platform; everything else is ours
        // to close.
        if state != ContextState::Interrupted {
            current.close();
        }

        let fresh = self.factory.create()?;
        let rewired = self.rewire(fresh.id());
        info!(
            "Replaced {} audio context {} with {} ({} gain nodes rewired)",
            state,
            current.id(),
            fresh.id(),
            rewired
        );

        *current = Arc::clone(&fresh);
        self.replacements.fetch_add(1, Ordering::Relaxed);
        Ok(fresh)
    }

    /// Reconciles, then resumes a suspended context.
    ///
    /// The returned future may stay pending for as long as the platform
    /// withholds the resume; callers bound it with their own timeout.
    pub async fn ensure_running(&self) -> SoundResult<Arc<dyn AudioContext>> {
        let context = self.reconcile()?;

        if context.state() == ContextState::Suspended {
            debug!("Resuming suspended audio context {}", context.id());
            context.resume().await?;
        }

        match context.state() {
            ContextState::Running => Ok(context),
            state => Err(SoundError::ContextUnavailable(format!(
                "audio context {} is {state}",
                context.id()
            ))),
        }
    }

    /// Reconnects every live, connected gain node to `context`.
    fn rewire(&self, context: ContextId) -> usize {
        let mut gains = self.gains.lock();
        prune(&mut gains);

        let mut rewired = 0;
        for gain in gains.iter().filter_map(Weak::upgrade) {
            gain.connect(context);
            rewired += 1;
        }
        rewired
    }
}

/// Drops dropped nodes and detached ones. A detached node belongs to an
/// evicted sound and is never connected again.
fn prune(gains: &mut Vec<Weak<GainNode>>) {
    gains.retain(|gain| gain.upgrade().is_some_and(|g| g.destination().is_some()));
}
