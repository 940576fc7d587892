use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};
use ri_core::{normalize_path, FileContainer};

use crate::clang_query::ClangQuery;
use crate::config::QueryConfig;
use crate::diagnostics::DynamicMatcherDiagnostics;
use crate::error::QueryError;
use crate::matcher::{parse_matcher_expression, Matcher};
use crate::messages::SourceRangesForQueryMessage;

/// Runs one query over a set of files, at most `processing_slots` files at
/// a time.
///
/// Owned by a control thread that polls [`ClangQueryGatherer::finished_messages`];
/// each poll refills the freed slots.
pub struct ClangQueryGatherer {
    /// Unstarted work, taken from the back.
    sources: Vec<FileContainer>,
    matcher: Option<Arc<Matcher>>,
    diagnostics: DynamicMatcherDiagnostics,
    processing_slots: usize,
    running: Vec<Receiver<SourceRangesForQueryMessage>>,
    pool: rayon::ThreadPool,
}

impl ClangQueryGatherer {
    /// `unsaved` files shadow the content of sources with the same path.
    pub fn new(
        sources: Vec<FileContainer>,
        unsaved: &[FileContainer],
        query: &str,
        config: &QueryConfig,
    ) -> Result<Self, QueryError> {
        let processing_slots = config.effective_slots();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(processing_slots)
            .thread_name(|index| format!("ri-query-{index}"))
            .build()
            .map_err(|e| QueryError::ThreadPool(e.to_string()))?;

        let unsaved: HashMap<String, &FileContainer> = unsaved
            .iter()
            .map(|file| (normalize_path(&file.file_path), file))
            .collect();
        let mut sources: Vec<FileContainer> = sources
            .into_iter()
            .map(|mut source| {
                if let Some(shadow) = unsaved.get(&normalize_path(&source.file_path)) {
                    source.content = shadow.content.clone();
                }
                source
            })
            .collect();
        sources.reverse();

        let (matcher, diagnostics) = match parse_matcher_expression(query) {
            Ok(matcher) => (Some(Arc::new(matcher)), Vec::new()),
            Err(diagnostics) => (None, diagnostics),
        };

        tracing::debug!(
            files = sources.len(),
            slots = processing_slots,
            valid = matcher.is_some(),
            "query gathering started"
        );
        Ok(Self {
            sources,
            matcher,
            diagnostics,
            processing_slots,
            running: Vec::new(),
            pool,
        })
    }

    /// Why the query could not be built; empty for a valid query.
    pub fn diagnostics(&self) -> &DynamicMatcherDiagnostics {
        &self.diagnostics
    }

    pub fn processing_slots(&self) -> usize {
        self.processing_slots
    }

    /// Start files until every slot is busy or no file is left.
    pub fn start_next(&mut self) {
        while self.running.len() < self.processing_slots {
            let Some(source) = self.sources.pop() else {
                break;
            };
            self.running.push(self.spawn(source));
        }
    }

    fn spawn(&self, source: FileContainer) -> Receiver<SourceRangesForQueryMessage> {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let matcher = self.matcher.clone();
        self.pool.spawn(move || {
            let path = source.file_path.clone();
            let result = catch_unwind(AssertUnwindSafe(|| match &matcher {
                Some(matcher) => ClangQuery::new().run(matcher, &source),
                None => Ok(Default::default()),
            }));
            let source_ranges = match result {
                Ok(Ok(ranges)) => ranges,
                Ok(Err(e)) => {
                    tracing::warn!(file = %path, error = %e, "query failed for file");
                    Default::default()
                }
                Err(_) => {
                    tracing::error!(file = %path, "query panicked");
                    Default::default()
                }
            };
            let _ = sender.send(SourceRangesForQueryMessage { source_ranges });
        });
        receiver
    }

    /// Messages of the files finished since the last call, then refill the
    /// slots. Never blocks.
    pub fn finished_messages(&mut self) -> Vec<SourceRangesForQueryMessage> {
        let mut messages = Vec::new();
        self.running.retain(|receiver| match receiver.try_recv() {
            Ok(message) => {
                messages.push(message);
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => false,
        });
        self.start_next();
        messages
    }

    /// Whether every started file has a result waiting.
    pub fn all_current_processes_are_finished(&self) -> bool {
        self.running.iter().all(|receiver| !receiver.is_empty())
    }

    pub fn is_finished(&self) -> bool {
        self.sources.is_empty() && self.running.is_empty()
    }

    /// Block until every file has been queried and return the remaining
    /// messages.
    pub fn wait_for_finished(&mut self) -> Vec<SourceRangesForQueryMessage> {
        let mut messages = Vec::new();
        self.start_next();
        while !self.running.is_empty() {
            for receiver in std::mem::take(&mut self.running) {
                if let Ok(message) = receiver.recv() {
                    messages.push(message);
                }
            }
            self.start_next();
        }
        messages
    }

    /// Drop unstarted files. Running ones finish and are still reported.
    pub fn cancel(&mut self) {
        let dropped = self.sources.len();
        self.sources.clear();
        tracing::debug!(dropped, "query gathering cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(count: usize) -> Vec<FileContainer> {
        (0..count)
            .map(|i| FileContainer::new(format!("/src/f{i}.cpp"), format!("int fn_{i}();\n")))
            .collect()
    }

    fn config(slots: usize) -> QueryConfig {
        QueryConfig {
            processing_slots: Some(slots),
        }
    }

    #[test]
    fn gathers_every_file() {
        let mut gatherer =
            ClangQueryGatherer::new(sources(5), &[], "functionDecl()", &config(2)).unwrap();
        let messages = gatherer.wait_for_finished();
        assert!(gatherer.is_finished());
        assert_eq!(messages.len(), 5);
        assert!(messages.iter().all(|m| m.source_ranges.ranges.len() == 1));
    }

    #[test]
    fn slots_bound_running_files() {
        let mut gatherer =
            ClangQueryGatherer::new(sources(5), &[], "functionDecl()", &config(2)).unwrap();
        gatherer.start_next();
        assert_eq!(gatherer.running.len(), 2);
        assert_eq!(gatherer.sources.len(), 3);
    }

    #[test]
    fn polling_eventually_drains() {
        let mut gatherer =
            ClangQueryGatherer::new(sources(4), &[], "functionDecl()", &config(1)).unwrap();
        gatherer.start_next();
        let mut received = 0;
        while !gatherer.is_finished() {
            received += gatherer.finished_messages().len();
            std::thread::yield_now();
        }
        assert_eq!(received, 4);
    }

    #[test]
    fn cancel_drops_unstarted_files() {
        let mut gatherer =
            ClangQueryGatherer::new(sources(6), &[], "functionDecl()", &config(2)).unwrap();
        gatherer.start_next();
        gatherer.cancel();
        let messages = gatherer.wait_for_finished();
        assert_eq!(messages.len(), 2);
        assert!(gatherer.is_finished());
    }

    #[test]
    fn unsaved_content_wins() {
        let unsaved = [FileContainer::new("/src/f0.cpp", "int a(); int b();\n")];
        let mut gatherer =
            ClangQueryGatherer::new(sources(1), &unsaved, "functionDecl()", &config(1)).unwrap();
        let messages = gatherer.wait_for_finished();
        assert_eq!(messages[0].source_ranges.ranges.len(), 2);
    }

    #[test]
    fn invalid_query_keeps_diagnostics() {
        let mut gatherer =
            ClangQueryGatherer::new(sources(2), &[], "functionDecl(", &config(1)).unwrap();
        assert!(!gatherer.diagnostics().is_empty());
        let messages = gatherer.wait_for_finished();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.source_ranges.is_empty()));
    }
}
