//! Behavior double that journals traversal order and error hooks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use interpose_core::{Behavior, BehaviorLabel, Context, Error, Next, Outcome, Result};

/// Shared, append-only log written by [`RecordingBehavior`]s.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// All entries in write order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Entries starting with `prefix`.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Pass-through behavior that records `>name` on the way in, `<name` on the
/// way out and `!name: {error}` for every background error it is told about.
///
/// Entries of background runs are prefixed with `bg`, e.g. `bg>name`.
#[derive(Debug, Clone)]
pub struct RecordingBehavior {
    name: String,
    journal: Journal,
    panic_on_error: bool,
    latency: Duration,
}

impl RecordingBehavior {
    /// Creates a behavior writing to `journal`.
    pub fn new(name: impl Into<String>, journal: Journal) -> Self {
        Self {
            name: name.into(),
            journal,
            panic_on_error: false,
            latency: Duration::ZERO,
        }
    }

    /// Makes the error hook panic after recording.
    pub fn panicking_hook(self) -> Self {
        Self {
            panic_on_error: true,
            ..self
        }
    }

    /// Sleeps for `latency` before passing the request on.
    pub fn with_latency(self, latency: Duration) -> Self {
        Self { latency, ..self }
    }
}

#[async_trait]
impl Behavior for RecordingBehavior {
    fn label(&self) -> BehaviorLabel {
        BehaviorLabel::new(self.name.as_str())
    }

    async fn process(&self, ctx: &mut Context, next: Next<'_>) -> Result<Outcome> {
        let prefix = if ctx.is_background() { "bg" } else { "" };
        self.journal.push(format!("{prefix}>{}", self.name));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let outcome = next.run(ctx).await;
        self.journal.push(format!("{prefix}<{}", self.name));
        outcome
    }

    fn on_background_error(&self, error: &Error) {
        self.journal.push(format!("!{}: {error}", self.name));
        if self.panic_on_error {
            panic!("error hook of `{}` panicked", self.name);
        }
    }
}
