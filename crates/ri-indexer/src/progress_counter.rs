use std::sync::{Mutex, PoisonError};

/// Receives `(progress, total)` on whichever thread changed the counter.
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Progress {
    progress: usize,
    total: usize,
}

/// Thread-safe progress tally. Once progress reaches the total, both are
/// reported and reset to zero.
///
/// The callback runs with the counter locked and must not call back into it.
pub struct ProgressCounter {
    state: Mutex<Progress>,
    callback: ProgressCallback,
}

impl ProgressCounter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            state: Mutex::new(Progress::default()),
            callback,
        }
    }

    /// A counter nobody listens to.
    pub fn silent() -> Self {
        Self::new(Box::new(|_, _| {}))
    }

    pub fn add_total(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.lock();
        state.total += count;
        (self.callback)(state.progress, state.total);
    }

    pub fn remove_total(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.lock();
        state.total = state.total.saturating_sub(count);
        self.send_progress(&mut state);
    }

    pub fn add_progress(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.lock();
        state.progress += count;
        self.send_progress(&mut state);
    }

    /// Current `(progress, total)`.
    pub fn snapshot(&self) -> (usize, usize) {
        let state = self.lock();
        (state.progress, state.total)
    }

    fn send_progress(&self, state: &mut Progress) {
        (self.callback)(state.progress, state.total);
        if state.progress >= state.total {
            *state = Progress::default();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Progress> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
