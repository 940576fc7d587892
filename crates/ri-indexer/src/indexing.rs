use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;
use ri_core::{FileContainer, FilePathCaching, FilePathId, ProjectPartContainer, ProjectPartId, ProjectPartPch};
use ri_storage::{StorageManager, SymbolDatabase};

use crate::collector::SymbolsCollectorFactory;
use crate::config::IndexConfig;
use crate::error::IndexerError;
use crate::file_status_cache::FileStatusCache;
use crate::generated_files::GeneratedFiles;
use crate::processor_manager::ProcessorManager;
use crate::progress_counter::{ProgressCallback, ProgressCounter};
use crate::symbol_indexer::{IndexerTaskQueue, ReindexState, SymbolIndexer};
use crate::task_scheduler::TaskScheduler;

/// The indexing pipeline wired together: generated files, processor pool,
/// scheduler, queue and indexer.
///
/// Driven from one control thread. After a message arrives on
/// [`SymbolIndexing::finished_receiver`] the owner calls
/// [`SymbolIndexing::process_entries`] to refill the freed slots.
pub struct SymbolIndexing {
    generated_files: Arc<GeneratedFiles>,
    progress: Arc<ProgressCounter>,
    database: Arc<Mutex<SymbolDatabase>>,
    indexer: SymbolIndexer,
    queue: IndexerTaskQueue,
    scheduler: TaskScheduler<SymbolsCollectorFactory>,
}

impl SymbolIndexing {
    pub fn new(
        database: SymbolDatabase,
        paths: Arc<dyn FilePathCaching>,
        config: &IndexConfig,
        progress: ProgressCallback,
    ) -> Result<Self, IndexerError> {
        let generated_files = Arc::new(GeneratedFiles::new());
        let progress = Arc::new(ProgressCounter::new(progress));
        let database = Arc::new(Mutex::new(database));

        let processors = ProcessorManager::new(
            SymbolsCollectorFactory::new(Arc::clone(&paths)),
            Arc::clone(&generated_files),
        );
        let scheduler = TaskScheduler::new(processors, Arc::clone(&progress), config)?;
        let file_statuses = Arc::new(FileStatusCache::new(Arc::clone(&paths)));
        let indexer = SymbolIndexer::new(Arc::clone(&database), paths, file_statuses);

        tracing::info!(
            slots = config.effective_concurrency(),
            policy = ?config.launch_policy,
            "symbol indexing ready"
        );
        Ok(Self {
            generated_files,
            queue: IndexerTaskQueue::new(Arc::clone(&progress)),
            progress,
            database,
            indexer,
            scheduler,
        })
    }

    pub fn from_storage(
        storage: StorageManager,
        config: &IndexConfig,
        progress: ProgressCallback,
    ) -> Result<Self, IndexerError> {
        let (database, paths) = storage.into_parts();
        Self::new(database, paths, config, progress)
    }

    pub fn update_project_parts(&mut self, parts: Vec<ProjectPartContainer>) {
        self.indexer.update_project_parts(parts, &mut self.queue);
        self.process_entries();
    }

    /// Like [`Self::update_project_parts`] for one part, reporting what it
    /// needed.
    pub fn update_project_part(
        &mut self,
        part: ProjectPartContainer,
    ) -> Result<ReindexState, IndexerError> {
        let state = self.indexer.update_project_part(part, &mut self.queue)?;
        self.process_entries();
        Ok(state)
    }

    pub fn remove_project_parts(&mut self, ids: &[ProjectPartId]) -> Result<(), IndexerError> {
        self.indexer.remove_project_parts(ids, &mut self.queue)
    }

    pub fn paths_changed(&mut self, ids: &[FilePathId]) -> Result<(), IndexerError> {
        self.indexer.paths_changed(ids, &mut self.queue)?;
        self.process_entries();
        Ok(())
    }

    pub fn update_precompiled_header(&self, pch: &ProjectPartPch) -> Result<(), IndexerError> {
        self.indexer.update_precompiled_header(pch)
    }

    pub fn remove_precompiled_header(&self, id: ProjectPartId) -> Result<(), IndexerError> {
        self.indexer.remove_precompiled_header(id)
    }

    /// Seen by every processor leased from now on.
    pub fn update_generated_files(&self, files: Vec<FileContainer>) {
        self.generated_files.update(files);
    }

    pub fn remove_generated_files(&self, paths: &[String]) {
        self.generated_files.remove(paths);
    }

    /// Hand queued tasks to free slots until either runs out. Never blocks.
    pub fn process_entries(&mut self) {
        loop {
            let pending = self.queue.len();
            self.queue.process_entries(&mut self.scheduler);
            if self.queue.is_empty() || self.queue.len() == pending {
                break;
            }
        }
    }

    /// Block until the queue is drained and no task is running.
    pub fn sync(&mut self) {
        loop {
            self.process_entries();
            self.scheduler.sync_tasks();
            if self.queue.is_empty() || self.scheduler.is_disabled() {
                break;
            }
        }
    }

    /// Stop starting tasks; running ones finish.
    pub fn disable(&mut self) {
        self.scheduler.disable();
    }

    pub fn finished_receiver(&self) -> Receiver<()> {
        self.scheduler.finished_receiver()
    }

    /// `(progress, total)`.
    pub fn progress(&self) -> (usize, usize) {
        self.progress.snapshot()
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.scheduler.has_running_tasks()
    }

    pub fn database(&self) -> &Arc<Mutex<SymbolDatabase>> {
        &self.database
    }

    pub fn paths(&self) -> &Arc<dyn FilePathCaching> {
        self.indexer.paths()
    }
}
