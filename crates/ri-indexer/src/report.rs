use std::time::Duration;

use crate::symbol_indexer::ReindexState;

/// Report generated after a one-shot indexing run.
#[derive(Debug)]
pub struct IndexReport {
    pub total_files_scanned: usize,
    pub sources: usize,
    pub headers: usize,
    pub state: ReindexState,
    pub total_symbols: usize,
    pub total_locations: usize,
    pub duration: Duration,
}

impl IndexReport {
    pub fn is_up_to_date(&self) -> bool {
        self.state == ReindexState::UpToDate
    }
}
