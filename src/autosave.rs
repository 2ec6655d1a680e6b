// src/autosave.rs - Debounced auto-save of open edit sessions
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, info, trace};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use crate::{NotePatch, NotesError, Result, SessionToken, SharedBoard};

/// Default debounce window between the last keystroke and the save
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(1500);

/// Generation of the currently open edit session, shared between the board
/// and the scheduler. Zero means no session is open.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    current: Arc<AtomicU64>,
    issued: Arc<AtomicU64>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session and returns its generation
    pub fn open(&self) -> u64 {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.store(generation, Ordering::SeqCst);
        generation
    }

    pub fn close(&self) {
        self.current.store(0, Ordering::SeqCst);
    }

    pub fn is_live(&self, token: &SessionToken) -> bool {
        token.generation != 0 && self.current.load(Ordering::SeqCst) == token.generation
    }
}

/// Coalesces edit events into one delayed commit per session.
///
/// A commit only runs if its session is still open when the timer fires;
/// closing the session is enough to make pending timers harmless.
pub struct AutoSaveScheduler {
    /// Debounce window
    delay: Duration,

    /// Shared with the board that opens and closes sessions
    gate: SessionGate,

    /// Pending timer per session
    pending: Mutex<HashMap<SessionToken, JoinHandle<()>>>,
}

impl AutoSaveScheduler {
    pub fn new(delay: Duration, gate: SessionGate) -> Self {
        info!("Initializing auto-save scheduler with delay {:?}", delay);
        Self {
            delay,
            gate,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `commit` to run after the delay, replacing any timer already
    /// pending for the same session.
    pub fn schedule<F, Fut>(&self, token: SessionToken, commit: F) -> Result<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| NotesError::LockAcquisitionFailed {
                message: "Failed to acquire lock on auto-save timers".to_string(),
            })?;

        pending.retain(|_, handle| !handle.is_finished());
        if let Some(previous) = pending.remove(&token) {
            trace!("Coalescing auto-save for note {}", token.note_id);
            previous.abort();
        }

        let gate = self.gate.clone();
        let delay = self.delay;
        let task = tokio::spawn(async move {
            time::sleep(delay).await;

            if !gate.is_live(&token) {
                debug!(
                    "Edit session {} for note {} closed, dropping auto-save",
                    token.generation, token.note_id
                );
                return;
            }

            commit().await;
        });

        pending.insert(token, task);
        Ok(())
    }

    /// Number of timers that have not fired yet
    pub fn pending(&self) -> usize {
        match self.pending.lock() {
            Ok(pending) => pending.values().filter(|h| !h.is_finished()).count(),
            Err(e) => {
                error!("Failed to acquire lock on auto-save timers: {}", e);
                0
            }
        }
    }

    /// Cancels every pending timer
    pub fn shutdown(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            for (_, handle) in pending.drain() {
                handle.abort();
            }
            debug!("Auto-save scheduler stopped");
        }
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Schedules an auto-save of `patch` into the note edited under `token`.
///
/// The commit goes through [`crate::NoteBoard::autosave`], which refuses to
/// blank a note and reports stale sessions as a no-op.
pub fn schedule_autosave(
    board: &SharedBoard,
    scheduler: &AutoSaveScheduler,
    token: SessionToken,
    patch: NotePatch,
) -> Result<()> {
    let board = Arc::clone(board);
    scheduler.schedule(token, move || async move {
        let mut board = board.lock().await;
        match board.autosave(token, &patch) {
            Ok(true) => info!("Auto-saved note {}", token.note_id),
            Ok(false) => trace!("Auto-save of note {} had nothing to write", token.note_id),
            Err(e) => error!("Auto-save of note {} failed: {}", token.note_id, e),
        }
    })
}
