use serde::Deserialize;

/// Configuration for query gathering.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Files queried in parallel; the machine's parallelism when unset.
    pub processing_slots: Option<usize>,
}

impl QueryConfig {
    pub fn effective_slots(&self) -> usize {
        self.processing_slots
            .filter(|n| *n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_default_to_parallelism() {
        assert!(QueryConfig::default().effective_slots() >= 1);
        let config: QueryConfig = serde_json::from_str(r#"{"processing_slots": 3}"#).unwrap();
        assert_eq!(config.effective_slots(), 3);
    }
}
