use std::sync::Arc;

use ri_core::FileContainer;

use crate::generated_files::GeneratedFiles;

/// A heavyweight, reusable worker object (one front end each).
pub trait Processor: Send + 'static {
    /// Replace the in-memory files the processor sees.
    fn set_unsaved_files(&mut self, files: &[FileContainer]);

    /// Drop per-task results before the processor goes back to the pool.
    fn clear(&mut self);

    /// Runs on the control thread after the task finished, when enabled.
    fn finalize_on_control_thread(&mut self) {}
}

pub trait ProcessorFactory {
    type Processor: Processor;

    fn create(&self) -> Self::Processor;
}

/// Pool of idle processors. A processor is leased by value and must be
/// handed back with [`ProcessorManager::return_processor`]; the pool never
/// shrinks.
pub struct ProcessorManager<F: ProcessorFactory> {
    factory: F,
    generated_files: Arc<GeneratedFiles>,
    idle: Vec<F::Processor>,
    created: usize,
}

impl<F: ProcessorFactory> ProcessorManager<F> {
    pub fn new(factory: F, generated_files: Arc<GeneratedFiles>) -> Self {
        Self {
            factory,
            generated_files,
            idle: Vec::new(),
            created: 0,
        }
    }

    /// An idle processor primed with the current generated files, or a new
    /// one.
    pub fn unused_processor(&mut self) -> F::Processor {
        let mut processor = match self.idle.pop() {
            Some(processor) => processor,
            None => {
                self.created += 1;
                tracing::debug!(created = self.created, "creating processor");
                self.factory.create()
            }
        };
        processor.set_unsaved_files(&self.generated_files.snapshot());
        processor
    }

    pub fn return_processor(&mut self, processor: F::Processor) {
        self.idle.push(processor);
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn created_count(&self) -> usize {
        self.created
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Default)]
    pub(crate) struct CountingProcessor {
        pub unsaved: usize,
        pub runs: usize,
    }

    impl Processor for CountingProcessor {
        fn set_unsaved_files(&mut self, files: &[FileContainer]) {
            self.unsaved = files.len();
        }

        fn clear(&mut self) {}
    }

    pub(crate) struct CountingFactory;

    impl ProcessorFactory for CountingFactory {
        type Processor = CountingProcessor;

        fn create(&self) -> CountingProcessor {
            CountingProcessor::default()
        }
    }

    #[test]
    fn processors_are_reused() {
        let mut manager = ProcessorManager::new(CountingFactory, Arc::default());
        let first = manager.unused_processor();
        let second = manager.unused_processor();
        assert_eq!(manager.created_count(), 2);

        manager.return_processor(first);
        manager.return_processor(second);
        let _again = manager.unused_processor();
        assert_eq!(manager.created_count(), 2);
        assert_eq!(manager.idle_count(), 1);
    }

    #[test]
    fn leased_processor_sees_generated_files() {
        let generated = Arc::new(GeneratedFiles::new());
        let mut manager = ProcessorManager::new(CountingFactory, generated.clone());
        let processor = manager.unused_processor();
        assert_eq!(processor.unsaved, 0);
        manager.return_processor(processor);

        generated.update(vec![FileContainer::new("/p/gen.h", "int x;")]);
        assert_eq!(manager.unused_processor().unsaved, 1);
    }
}
