use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use ri_core::{
    FilePathCaching, FilePathId, ProjectPartArtefact, ProjectPartContainer, ProjectPartId,
    ProjectPartPch,
};
use ri_storage::{IncludedFileStatus, SymbolDatabase};

use crate::collector::SymbolsCollector;
use crate::command_line;
use crate::error::IndexerError;
use crate::file_status_cache::FileStatusCache;
use crate::part_batch::PartBatch;
use crate::task_queue::{SymbolIndexerTask, SymbolIndexerTaskQueue};

pub type IndexerTask = SymbolIndexerTask<SymbolsCollector>;
pub type IndexerTaskQueue = SymbolIndexerTaskQueue<SymbolsCollector>;

/// What indexing a project part has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexState {
    /// Never indexed, or its configuration changed: every source.
    NeedsFullReindex,
    /// Some sources or their includes changed on disk.
    NeedsIncrementalReindex,
    UpToDate,
}

/// Decides which sources of a project part need indexing and queues one
/// task per source. The tasks of a part collect on workers; the last one to
/// finish commits all their tables in one immediate transaction.
pub struct SymbolIndexer {
    database: Arc<Mutex<SymbolDatabase>>,
    paths: Arc<dyn FilePathCaching>,
    file_statuses: Arc<FileStatusCache>,
}

impl SymbolIndexer {
    pub fn new(
        database: Arc<Mutex<SymbolDatabase>>,
        paths: Arc<dyn FilePathCaching>,
        file_statuses: Arc<FileStatusCache>,
    ) -> Self {
        Self {
            database,
            paths,
            file_statuses,
        }
    }

    /// Failures are contained per part.
    pub fn update_project_parts(
        &self,
        parts: Vec<ProjectPartContainer>,
        queue: &mut IndexerTaskQueue,
    ) {
        for part in parts {
            let id = part.project_part_id;
            if let Err(e) = self.update_project_part(part, queue) {
                tracing::error!(project_part = %id, error = %e, "cannot update project part");
            }
        }
    }

    #[tracing::instrument(skip_all, fields(project_part = %part.project_part_id))]
    pub fn update_project_part(
        &self,
        mut part: ProjectPartContainer,
        queue: &mut IndexerTaskQueue,
    ) -> Result<ReindexState, IndexerError> {
        part.normalize();

        let (artefact, pch) = {
            let database = self.lock_database("fetch_artefact")?;
            (
                database.fetch_project_part_artefact(part.project_part_id)?,
                database.fetch_precompiled_header(part.project_part_id)?,
            )
        };

        let (state, sources) = match artefact {
            Some(artefact) if !artefact.configuration_differs(&part) => {
                let stale = self.stale_sources(&part.source_path_ids)?;
                if stale.is_empty() {
                    (ReindexState::UpToDate, stale)
                } else {
                    (ReindexState::NeedsIncrementalReindex, stale)
                }
            }
            _ => (ReindexState::NeedsFullReindex, part.source_path_ids.clone()),
        };
        tracing::debug!(?state, sources = sources.len(), "project part checked");

        if !sources.is_empty() {
            let tasks = self.create_tasks(Arc::new(part), pch.as_ref(), &sources);
            queue.add_or_update_tasks(tasks);
        }
        Ok(state)
    }

    /// Queue every main source whose include closure contains one of
    /// `file_path_ids`, built with the stored configuration of its part.
    #[tracing::instrument(skip_all, fields(paths = file_path_ids.len()))]
    pub fn paths_changed(
        &self,
        file_path_ids: &[FilePathId],
        queue: &mut IndexerTaskQueue,
    ) -> Result<(), IndexerError> {
        self.file_statuses.update_many(file_path_ids);

        let mut by_part: BTreeMap<ProjectPartId, Vec<FilePathId>> = BTreeMap::new();
        {
            let database = self.lock_database("fetch_dependent_sources")?;
            for id in file_path_ids {
                for (source, part) in database.fetch_dependent_sources(*id)? {
                    by_part.entry(part).or_default().push(source);
                }
            }
        }

        let mut tasks = Vec::new();
        for (project_part_id, mut sources) in by_part {
            sources.sort();
            sources.dedup();

            let (artefact, pch) = {
                let database = self.lock_database("fetch_artefact")?;
                let artefact = match database.fetch_project_part_artefact(project_part_id) {
                    Ok(artefact) => artefact,
                    Err(e) => {
                        tracing::error!(project_part = %project_part_id, error = %e, "stored project part unreadable");
                        continue;
                    }
                };
                (artefact, database.fetch_precompiled_header(project_part_id)?)
            };
            let Some(artefact) = artefact else {
                continue;
            };

            let part = Arc::new(artefact.to_container(sources.clone()));
            tasks.extend(self.create_tasks(part, pch.as_ref(), &sources));
        }

        tracing::debug!(tasks = tasks.len(), "changed paths queued");
        queue.add_or_update_tasks(tasks);
        Ok(())
    }

    /// Drop queued work and stored rows of the given parts.
    pub fn remove_project_parts(
        &self,
        project_part_ids: &[ProjectPartId],
        queue: &mut IndexerTaskQueue,
    ) -> Result<(), IndexerError> {
        queue.remove_tasks(project_part_ids);

        let mut database = self.lock_database("remove_project_parts")?;
        let transaction = database.begin_immediate()?;
        for id in project_part_ids {
            transaction.remove_project_part(*id)?;
        }
        transaction.commit()?;
        Ok(())
    }

    /// Register the precompiled header of a part. Later tasks of the part
    /// are built with it.
    pub fn update_precompiled_header(&self, pch: &ProjectPartPch) -> Result<(), IndexerError> {
        let mut database = self.lock_database("update_precompiled_header")?;
        let transaction = database.begin_immediate()?;
        transaction.insert_precompiled_header(pch)?;
        transaction.commit()?;
        Ok(())
    }

    pub fn remove_precompiled_header(&self, project_part_id: ProjectPartId) -> Result<(), IndexerError> {
        let mut database = self.lock_database("remove_precompiled_header")?;
        let transaction = database.begin_immediate()?;
        transaction.delete_precompiled_header(project_part_id)?;
        transaction.commit()?;
        Ok(())
    }

    /// A source is stale when any file of its stored include closure has no
    /// stored status or was modified after it.
    fn stale_sources(&self, sources: &[FilePathId]) -> Result<Vec<FilePathId>, IndexerError> {
        let database = self.lock_database("fetch_file_statuses")?;
        let mut stale = Vec::new();
        for source in sources {
            let closure = database.fetch_closure_file_statuses(*source)?;
            if closure.iter().any(|included| self.is_modified(included)) {
                stale.push(*source);
            }
        }
        Ok(stale)
    }

    fn is_modified(&self, included: &IncludedFileStatus) -> bool {
        match (
            included.status,
            self.file_statuses.last_modified(included.file_path_id),
        ) {
            (Some(stored), Some(current)) => stored.last_modified < current,
            _ => true,
        }
    }

    fn create_tasks(
        &self,
        part: Arc<ProjectPartContainer>,
        pch: Option<&ProjectPartPch>,
        sources: &[FilePathId],
    ) -> Vec<IndexerTask> {
        let arguments = Arc::new(command_line::build(&part, pch));
        let project_part_id = part.project_part_id;
        let tickets = PartBatch::tickets(Arc::clone(&self.database), part, sources.len());
        sources
            .iter()
            .zip(tickets)
            .map(|(&source, ticket)| {
                let arguments = Arc::clone(&arguments);
                SymbolIndexerTask::new(
                    source,
                    project_part_id,
                    Box::new(move |collector: &mut SymbolsCollector| {
                        collector.add_file(source, arguments.to_vec());
                        if !collector.collect_symbols() {
                            tracing::warn!(file = %source, project_part = %project_part_id, "source not indexed");
                            return;
                        }
                        let (tables, stamps) = collector.take_results();
                        ticket.submit(tables, stamps);
                    }),
                )
            })
            .collect()
    }

    fn lock_database(
        &self,
        stage: &str,
    ) -> Result<std::sync::MutexGuard<'_, SymbolDatabase>, IndexerError> {
        self.database
            .lock()
            .map_err(|_| IndexerError::lock_poisoned(stage))
    }

    pub fn paths(&self) -> &Arc<dyn FilePathCaching> {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};

    use ri_core::{normalize_path, CompilerMacro};
    use ri_storage::FilePathCache;

    use super::*;
    use crate::progress_counter::ProgressCounter;

    struct Fixture {
        _dir: tempfile::TempDir,
        indexer: SymbolIndexer,
        paths: Arc<FilePathCache>,
        database: Arc<Mutex<SymbolDatabase>>,
        main: FilePathId,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.cpp");
        fs::write(&path, "int answer() { return 42; }\n").unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(UNIX_EPOCH + Duration::from_secs(5_000))
            .unwrap();

        let paths = Arc::new(FilePathCache::in_memory());
        let main = paths.file_path_id(&normalize_path(&path.to_string_lossy()));
        let database = Arc::new(Mutex::new(SymbolDatabase::open_in_memory().unwrap()));
        let indexer = SymbolIndexer::new(
            database.clone(),
            paths.clone(),
            Arc::new(FileStatusCache::new(paths.clone())),
        );
        Fixture {
            _dir: dir,
            indexer,
            paths,
            database,
            main,
        }
    }

    fn queue() -> IndexerTaskQueue {
        SymbolIndexerTaskQueue::new(Arc::new(ProgressCounter::silent()))
    }

    fn run_queued(fixture: &Fixture, queue: &mut IndexerTaskQueue) {
        let mut collector = SymbolsCollector::new(fixture.paths.clone());
        let tasks = std::mem::replace(queue, self::queue());
        for task in tasks.into_tasks() {
            (task.callable)(&mut collector);
            crate::processor_manager::Processor::clear(&mut collector);
        }
    }

    #[test]
    fn new_part_needs_full_reindex() {
        let fixture = fixture();
        let mut queue = queue();
        let part = ProjectPartContainer::new(ProjectPartId(1), vec![fixture.main]);
        let state = fixture.indexer.update_project_part(part, &mut queue).unwrap();

        assert_eq!(state, ReindexState::NeedsFullReindex);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn indexed_part_is_up_to_date() {
        let fixture = fixture();
        let mut queue = queue();
        let part = ProjectPartContainer::new(ProjectPartId(1), vec![fixture.main]);
        fixture.indexer.update_project_part(part.clone(), &mut queue).unwrap();
        run_queued(&fixture, &mut queue);

        assert!(fixture.database.lock().unwrap().count_symbols().unwrap() > 0);
        let state = fixture.indexer.update_project_part(part, &mut queue).unwrap();
        assert_eq!(state, ReindexState::UpToDate);
        assert!(queue.is_empty());
    }

    #[test]
    fn macro_change_forces_full_reindex() {
        let fixture = fixture();
        let mut queue = queue();
        let mut part = ProjectPartContainer::new(ProjectPartId(1), vec![fixture.main]);
        fixture.indexer.update_project_part(part.clone(), &mut queue).unwrap();
        run_queued(&fixture, &mut queue);

        part.compiler_macros.push(CompilerMacro::new("NDEBUG", ""));
        let state = fixture.indexer.update_project_part(part, &mut queue).unwrap();
        assert_eq!(state, ReindexState::NeedsFullReindex);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn removing_a_part_drops_queue_and_rows() {
        let fixture = fixture();
        let mut queue = queue();
        let part = ProjectPartContainer::new(ProjectPartId(1), vec![fixture.main]);
        fixture.indexer.update_project_part(part.clone(), &mut queue).unwrap();
        run_queued(&fixture, &mut queue);
        fixture.indexer.update_project_part(
            ProjectPartContainer::new(ProjectPartId(2), vec![fixture.main]),
            &mut queue,
        )
        .unwrap();

        fixture
            .indexer
            .remove_project_parts(&[ProjectPartId(1), ProjectPartId(2)], &mut queue)
            .unwrap();
        assert!(queue.is_empty());
        let ids = fixture.database.lock().unwrap().fetch_project_part_ids().unwrap();
        assert!(ids.is_empty());
    }
}
