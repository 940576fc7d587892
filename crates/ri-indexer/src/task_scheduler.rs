use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::config::{IndexConfig, LaunchPolicy};
use crate::error::IndexerError;
use crate::processor_manager::{Processor, ProcessorFactory, ProcessorManager};
use crate::progress_counter::ProgressCounter;

/// A unit of work run against a leased processor.
pub type Task<P> = Box<dyn FnOnce(&mut P) + Send + 'static>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlotUsage {
    pub free: usize,
    pub used: usize,
}

/// What a task queue needs from a scheduler.
pub trait TaskSchedulerInterface<T> {
    fn add_tasks(&mut self, tasks: Vec<T>);

    /// Reclaims finished tasks first. Never blocks.
    fn slot_usage(&mut self) -> SlotUsage;
}

/// Runs tasks on a fixed-size worker pool, each bound to one leased
/// processor.
///
/// Owned by the control thread. Workers hand their processor back through a
/// one-shot channel and ping [`TaskScheduler::finished_receiver`].
pub struct TaskScheduler<F: ProcessorFactory> {
    processors: ProcessorManager<F>,
    pool: rayon::ThreadPool,
    running: Vec<Receiver<Option<F::Processor>>>,
    hardware_concurrency: usize,
    launch_policy: LaunchPolicy,
    finalize_on_control_thread: bool,
    progress: Arc<ProgressCounter>,
    finished_sender: Sender<()>,
    finished_receiver: Receiver<()>,
    disabled: bool,
}

impl<F: ProcessorFactory> TaskScheduler<F> {
    pub fn new(
        processors: ProcessorManager<F>,
        progress: Arc<ProgressCounter>,
        config: &IndexConfig,
    ) -> Result<Self, IndexerError> {
        let hardware_concurrency = config.effective_concurrency();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(hardware_concurrency)
            .thread_name(|index| format!("ri-index-{index}"))
            .build()
            .map_err(|e| IndexerError::ThreadPool(e.to_string()))?;
        let (finished_sender, finished_receiver) = crossbeam_channel::unbounded();

        Ok(Self {
            processors,
            pool,
            running: Vec::new(),
            hardware_concurrency,
            launch_policy: config.launch_policy,
            finalize_on_control_thread: config.finalize_on_control_thread,
            progress,
            finished_sender,
            finished_receiver,
            disabled: false,
        })
    }

    /// Receives one message per finished task.
    pub fn finished_receiver(&self) -> Receiver<()> {
        self.finished_receiver.clone()
    }

    /// Stop offering slots. Running tasks are not cancelled.
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn has_running_tasks(&self) -> bool {
        !self.running.is_empty()
    }

    /// Block until every running task has finished and was reclaimed.
    pub fn sync_tasks(&mut self) {
        for receiver in std::mem::take(&mut self.running) {
            let processor = receiver.recv().ok().flatten();
            self.reclaim(processor);
        }
    }

    pub fn processors(&self) -> &ProcessorManager<F> {
        &self.processors
    }

    fn reclaim_finished(&mut self) {
        let mut still_running = Vec::with_capacity(self.running.len());
        for receiver in std::mem::take(&mut self.running) {
            match receiver.try_recv() {
                Ok(processor) => self.reclaim(processor),
                Err(TryRecvError::Empty) => still_running.push(receiver),
                Err(TryRecvError::Disconnected) => self.reclaim(None),
            }
        }
        self.running = still_running;
    }

    /// A processor whose task panicked is dropped; the pool creates a new
    /// one on demand.
    fn reclaim(&mut self, processor: Option<F::Processor>) {
        if let Some(mut processor) = processor {
            if self.finalize_on_control_thread {
                processor.finalize_on_control_thread();
            }
            processor.clear();
            self.processors.return_processor(processor);
        }
        self.progress.add_progress(1);
    }
}

fn run_task<P: Processor>(task: Task<P>, mut processor: P) -> Option<P> {
    match catch_unwind(AssertUnwindSafe(|| task(&mut processor))) {
        Ok(()) => Some(processor),
        Err(_) => {
            tracing::error!("indexing task panicked; dropping its processor");
            None
        }
    }
}

impl<F: ProcessorFactory> TaskSchedulerInterface<Task<F::Processor>> for TaskScheduler<F> {
    fn add_tasks(&mut self, tasks: Vec<Task<F::Processor>>) {
        for task in tasks {
            let processor = self.processors.unused_processor();
            let (sender, receiver) = crossbeam_channel::bounded(1);

            match self.launch_policy {
                LaunchPolicy::Async => {
                    let finished = self.finished_sender.clone();
                    self.pool.spawn(move || {
                        let processor = run_task(task, processor);
                        let _ = sender.send(processor);
                        let _ = finished.send(());
                    });
                }
                LaunchPolicy::Deferred => {
                    let _ = sender.send(run_task(task, processor));
                    let _ = self.finished_sender.send(());
                }
            }
            self.running.push(receiver);
        }
    }

    fn slot_usage(&mut self) -> SlotUsage {
        self.reclaim_finished();
        let used = self.running.len();
        if self.disabled {
            return SlotUsage { free: 0, used };
        }
        SlotUsage {
            free: self.hardware_concurrency.saturating_sub(used),
            used,
        }
    }
}

impl<F: ProcessorFactory> Drop for TaskScheduler<F> {
    fn drop(&mut self) {
        self.sync_tasks();
    }
}
