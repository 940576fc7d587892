use serde::Deserialize;

/// How the scheduler runs a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchPolicy {
    /// On the worker pool.
    #[default]
    Async,
    /// Inline on the calling thread, inside `add_tasks`.
    Deferred,
}

/// Configuration for the indexing pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of parallel slots; the machine's parallelism when unset.
    pub hardware_concurrency: Option<usize>,
    pub launch_policy: LaunchPolicy,
    /// Run the processors' finalize hook on the control thread when a
    /// task is reclaimed.
    pub finalize_on_control_thread: bool,
    /// Debounce window of the path watcher.
    pub watcher_debounce_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            hardware_concurrency: None,
            launch_policy: LaunchPolicy::Async,
            finalize_on_control_thread: false,
            watcher_debounce_ms: 300,
        }
    }
}

impl IndexConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.hardware_concurrency
            .filter(|n| *n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_override() {
        let config = IndexConfig {
            hardware_concurrency: Some(3),
            ..Default::default()
        };
        assert_eq!(config.effective_concurrency(), 3);

        let zero = IndexConfig {
            hardware_concurrency: Some(0),
            ..Default::default()
        };
        assert!(zero.effective_concurrency() >= 1);
    }
}
