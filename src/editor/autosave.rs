//! Debounced persistence.
//!
//! Changes are coalesced by a [`DelayedTask`]: queuing replaces the pending
//! value and restarts the delay, so a burst of edits produces one save that
//! carries the state after the last edit. Time comes from a [`Clock`] so
//! tests can drive it by hand.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, warn};

/// Default debounce delay between the last change and the save.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// How long a "saved" status stays visible.
pub const SAVED_STATUS_MS: u64 = 2000;

/// Millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// A cancellable task that fires once `delay_ms` has passed since the last
/// [`DelayedTask::queue`].
#[derive(Debug, Clone)]
pub struct DelayedTask<T> {
    delay_ms: u64,
    pending: Option<(T, u64)>,
}

impl<T> DelayedTask<T> {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Replace any pending value and restart the delay.
    pub fn queue(&mut self, value: T, now_ms: u64) {
        self.pending = Some((value, now_ms));
    }

    /// Take the pending value if its delay has elapsed.
    pub fn take_ready(&mut self, now_ms: u64) -> Option<T> {
        let (_, queued_at) = self.pending.as_ref()?;
        if now_ms.saturating_sub(*queued_at) >= self.delay_ms {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// Take the pending value regardless of the delay.
    pub fn take_now(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes ready.
    pub fn due_at(&self) -> Option<u64> {
        self.pending
            .as_ref()
            .map(|(_, queued_at)| queued_at.saturating_add(self.delay_ms))
    }

    pub const fn delay_ms(&self) -> u64 {
        self.delay_ms
    }
}

/// Persistence status shown to the author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved {
        at_ms: u64,
    },
    Failed {
        message: String,
    },
}

impl SaveStatus {
    pub fn label(&self) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Saving => "Saving...".to_string(),
            Self::Saved { .. } => "Saved".to_string(),
            Self::Failed { message } => format!("Save failed: {message}"),
        }
    }
}

/// One save to perform. `generation` orders saves; only the newest one may
/// settle the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub generation: u64,
    pub content: String,
}

/// Debounce plus last-write-wins bookkeeping for saves.
#[derive(Debug, Clone)]
pub struct AutoSaver {
    task: DelayedTask<String>,
    issued: u64,
    status: SaveStatus,
    latest_content: Option<String>,
}

impl AutoSaver {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            task: DelayedTask::new(delay_ms),
            issued: 0,
            status: SaveStatus::Idle,
            latest_content: None,
        }
    }

    /// Schedule a save of `content`, superseding any pending one.
    pub fn content_changed(&mut self, content: String, now_ms: u64) {
        self.latest_content = Some(content.clone());
        self.task.queue(content, now_ms);
    }

    /// Issue a save if the debounce delay has elapsed.
    pub fn poll(&mut self, now_ms: u64) -> Option<SaveTicket> {
        let content = self.task.take_ready(now_ms)?;
        Some(self.issue(content))
    }

    /// Issue the pending save immediately (unmount, explicit save).
    pub fn flush(&mut self) -> Option<SaveTicket> {
        let content = self.task.take_now()?;
        Some(self.issue(content))
    }

    fn issue(&mut self, content: String) -> SaveTicket {
        self.issued += 1;
        self.status = SaveStatus::Saving;
        debug!(generation = self.issued, bytes = content.len(), "issuing save");
        SaveTicket {
            generation: self.issued,
            content,
        }
    }

    /// Settle a save. Results of superseded saves are ignored; returns
    /// whether this result was applied.
    pub fn complete(&mut self, generation: u64, result: Result<(), String>, now_ms: u64) -> bool {
        if generation != self.issued {
            debug!(generation, newest = self.issued, "ignoring superseded save result");
            return false;
        }
        self.status = match result {
            Ok(()) => SaveStatus::Saved { at_ms: now_ms },
            Err(message) => {
                warn!(generation, %message, "save failed");
                SaveStatus::Failed { message }
            }
        };
        true
    }

    /// Re-queue the latest content after a failure.
    pub fn retry(&mut self, now_ms: u64) -> bool {
        if !matches!(self.status, SaveStatus::Failed { .. }) || self.task.is_pending() {
            return false;
        }
        let Some(content) = self.latest_content.clone() else {
            return false;
        };
        self.task.queue(content, now_ms);
        true
    }

    /// Expire a stale "saved" status. Returns whether the status changed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if let SaveStatus::Saved { at_ms } = self.status
            && now_ms.saturating_sub(at_ms) >= SAVED_STATUS_MS
        {
            self.status = SaveStatus::Idle;
            return true;
        }
        false
    }

    pub const fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub const fn is_pending(&self) -> bool {
        self.task.is_pending()
    }

    pub fn due_at(&self) -> Option<u64> {
        self.task.due_at()
    }
}

impl Default for AutoSaver {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}
