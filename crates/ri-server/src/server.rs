use std::collections::BTreeMap;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::{select, Receiver};
use ri_core::{normalize_path, FileContainer, ProjectPartId, ProjectPartPch};
use ri_indexer::{start_watching, SymbolIndexing, WatcherHandle};
use ri_query::{
    ClangQuery, ClangQueryGatherer, QueryConfig, QueryError, SourceLocationsForRenamingMessage,
    SymbolFinder,
};
use ri_storage::StorageManager;

use crate::client::{JsonLinesClient, RefactoringClient};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::protocol::{read_requests, ProjectPartMessage, Request};

/// How long the control loop waits for input before polling running work.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Turns protocol requests into indexing, query and renaming work and
/// reports the results to a client.
///
/// Everything runs on the thread that owns the server. Indexing and
/// gathered queries proceed on worker pools; [`RefactoringServer::poll`]
/// collects what they finished.
pub struct RefactoringServer<C: RefactoringClient> {
    client: C,
    indexing: SymbolIndexing,
    query_config: QueryConfig,
    gatherer: Option<ClangQueryGatherer>,
    symbol_finder: SymbolFinder,
    /// Mirror of the indexer's generated files, for queries and renaming.
    generated_files: BTreeMap<String, FileContainer>,
    progress: Receiver<(usize, usize)>,
    watcher: Option<WatcherHandle>,
}

impl<C: RefactoringClient> RefactoringServer<C> {
    pub fn new(client: C, storage: StorageManager, config: &ServerConfig) -> Result<Self, ServerError> {
        let (progress_sender, progress) = crossbeam_channel::unbounded();
        let indexing = SymbolIndexing::from_storage(
            storage,
            &config.index,
            Box::new(move |progress, total| {
                let _ = progress_sender.send((progress, total));
            }),
        )?;

        let watcher = match &config.watch_root {
            Some(root) => {
                let debounce = Duration::from_millis(config.index.watcher_debounce_ms);
                let handle = start_watching(root, debounce)?;
                tracing::info!(root = %handle.root().display(), "watching for changes");
                Some(handle)
            }
            None => None,
        };

        Ok(Self {
            client,
            indexing,
            query_config: config.query.clone(),
            gatherer: None,
            symbol_finder: SymbolFinder::new(),
            generated_files: BTreeMap::new(),
            progress,
            watcher,
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    pub fn indexing(&self) -> &SymbolIndexing {
        &self.indexing
    }

    /// Handle one request. Failures are reported to the client and do not
    /// stop the server. Returns `false` once the client asked to end.
    pub fn handle(&mut self, request: Request) -> bool {
        let result = match request {
            Request::UpdateProjectParts { project_parts } => {
                self.update_project_parts(project_parts);
                Ok(())
            }
            Request::RemoveProjectParts { project_part_ids } => {
                self.remove_project_parts(&project_part_ids)
            }
            Request::UpdateGeneratedFiles { files } => {
                self.update_generated_files(files);
                Ok(())
            }
            Request::RemoveGeneratedFiles { file_paths } => {
                self.remove_generated_files(&file_paths);
                Ok(())
            }
            Request::UpdatePrecompiledHeader { pch } => self.update_precompiled_header(&pch),
            Request::RemovePrecompiledHeader { project_part_id } => {
                self.remove_precompiled_header(project_part_id)
            }
            Request::PathsChanged { file_paths } => self.paths_changed(&file_paths),
            Request::RequestSourceRangesAndDiagnosticsForQuery { query, source } => {
                self.request_source_ranges_and_diagnostics_for_query(&query, &source)
            }
            Request::RequestSourceRangesForQuery {
                query,
                sources,
                unsaved_files,
            } => self.request_source_ranges_for_query(&query, sources, unsaved_files),
            Request::RequestSourceLocationsForRenaming { file, line, column } => {
                self.request_source_locations_for_renaming(&file, line, column)
            }
            Request::CancelQuery => {
                self.cancel_query();
                Ok(())
            }
            Request::End => return false,
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "request failed");
            self.client.error(e.to_string());
        }
        true
    }

    /// Queue the stale files of every part. A part whose stored
    /// configuration cannot be read is reported and skipped.
    pub fn update_project_parts(&mut self, parts: Vec<ProjectPartMessage>) {
        for message in parts {
            let id = message.project_part_id;
            let part = message.into_container(self.indexing.paths().as_ref());
            match self.indexing.update_project_part(part) {
                Ok(state) => tracing::debug!(part = %id, ?state, "project part updated"),
                Err(e) => {
                    tracing::error!(part = %id, error = %e, "project part update failed");
                    self.client.error(format!("project part {id}: {e}"));
                }
            }
        }
    }

    pub fn remove_project_parts(&mut self, ids: &[ProjectPartId]) -> Result<(), ServerError> {
        self.indexing.remove_project_parts(ids)?;
        Ok(())
    }

    pub fn update_generated_files(&mut self, files: Vec<FileContainer>) {
        for file in &files {
            self.generated_files
                .insert(normalize_path(&file.file_path), file.clone());
        }
        self.indexing.update_generated_files(files);
    }

    pub fn remove_generated_files(&mut self, paths: &[String]) {
        for path in paths {
            self.generated_files.remove(&normalize_path(path));
        }
        self.indexing.remove_generated_files(paths);
    }

    pub fn update_precompiled_header(&mut self, pch: &ProjectPartPch) -> Result<(), ServerError> {
        self.indexing.update_precompiled_header(pch)?;
        Ok(())
    }

    pub fn remove_precompiled_header(&mut self, id: ProjectPartId) -> Result<(), ServerError> {
        self.indexing.remove_precompiled_header(id)?;
        Ok(())
    }

    pub fn paths_changed(&mut self, paths: &[String]) -> Result<(), ServerError> {
        let ids: Vec<_> = paths
            .iter()
            .map(|path| self.indexing.paths().file_path_id(&normalize_path(path)))
            .collect();
        self.indexing.paths_changed(&ids)?;
        Ok(())
    }

    pub fn request_source_ranges_and_diagnostics_for_query(
        &mut self,
        query: &str,
        source: &FileContainer,
    ) -> Result<(), ServerError> {
        let message = ClangQuery::new().find_locations(source, query)?;
        self.client.source_ranges_and_diagnostics_for_query(message);
        Ok(())
    }

    /// Start a gathered query. One still running is cancelled first: its
    /// unstarted files are dropped and its running ones are reported.
    pub fn request_source_ranges_for_query(
        &mut self,
        query: &str,
        sources: Vec<FileContainer>,
        mut unsaved_files: Vec<FileContainer>,
    ) -> Result<(), ServerError> {
        if let Some(mut previous) = self.gatherer.take() {
            previous.cancel();
            for message in previous.wait_for_finished() {
                self.client.source_ranges_for_query(message);
            }
        }
        unsaved_files.extend(self.generated_files.values().cloned());
        let mut gatherer =
            ClangQueryGatherer::new(sources, &unsaved_files, query, &self.query_config)?;
        gatherer.start_next();
        self.gatherer = Some(gatherer);
        Ok(())
    }

    /// A cursor on no symbol answers with an empty message.
    pub fn request_source_locations_for_renaming(
        &mut self,
        file: &FileContainer,
        line: u32,
        column: u32,
    ) -> Result<(), ServerError> {
        self.symbol_finder
            .set_unsaved_files(self.generated_files.values().cloned().collect());
        let message = match self.symbol_finder.find(file, line, column) {
            Ok(message) => message,
            Err(QueryError::NoSymbolAtCursor { .. }) => SourceLocationsForRenamingMessage {
                text_document_revision: file.document_revision,
                ..Default::default()
            },
            Err(e) => return Err(e.into()),
        };
        self.client.source_locations_for_renaming(message);
        Ok(())
    }

    pub fn cancel_query(&mut self) {
        if let Some(gatherer) = &mut self.gatherer {
            gatherer.cancel();
        }
    }

    /// Collect finished work without blocking: refill indexing slots,
    /// forward progress and query results, feed watcher events to the
    /// indexer.
    pub fn poll(&mut self) {
        self.indexing.process_entries();

        if let Some(gatherer) = &mut self.gatherer {
            for message in gatherer.finished_messages() {
                self.client.source_ranges_for_query(message);
            }
            if gatherer.is_finished() {
                self.gatherer = None;
            }
        }

        let changed: Vec<PathBuf> = match &self.watcher {
            Some(watcher) => watcher
                .events
                .try_iter()
                .map(|event| event.path().to_path_buf())
                .collect(),
            None => Vec::new(),
        };
        if !changed.is_empty() {
            let paths: Vec<String> = changed
                .iter()
                .map(|path| path.to_string_lossy().into_owned())
                .collect();
            if let Err(e) = self.paths_changed(&paths) {
                tracing::warn!(error = %e, "watched changes not indexed");
            }
        }

        for (progress, total) in self.progress.try_iter() {
            self.client.progress(progress, total);
        }
    }

    pub fn is_idle(&self) -> bool {
        self.indexing.is_idle() && self.gatherer.is_none()
    }

    /// Finish all queued work, blocking, and report it.
    pub fn shutdown(&mut self) {
        self.indexing.sync();
        if let Some(mut gatherer) = self.gatherer.take() {
            for message in gatherer.wait_for_finished() {
                self.client.source_ranges_for_query(message);
            }
        }
        for (progress, total) in self.progress.try_iter() {
            self.client.progress(progress, total);
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
        tracing::info!("server stopped");
    }

    /// Serve requests until the client ends the session or the channel
    /// closes, then shut down.
    pub fn run(&mut self, requests: Receiver<Result<Request, ServerError>>) {
        let indexing_finished = self.indexing.finished_receiver();
        loop {
            let keep_going = select! {
                recv(requests) -> request => match request {
                    Ok(Ok(request)) => self.handle(request),
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "unreadable request");
                        self.client.error(e.to_string());
                        true
                    }
                    Err(_) => false,
                },
                recv(indexing_finished) -> _ => true,
                default(POLL_INTERVAL) => true,
            };
            self.poll();
            if !keep_going {
                break;
            }
        }
        self.shutdown();
    }
}

/// Serve JSON-lines requests from `input` and write responses to `output`
/// until the input ends or an `end` request arrives.
pub fn serve<R, W>(
    config: &ServerConfig,
    storage: StorageManager,
    input: R,
    output: W,
) -> Result<W, ServerError>
where
    R: Read + Send + 'static,
    W: Write,
{
    let (sender, requests) = crossbeam_channel::unbounded();
    let reader = std::thread::Builder::new()
        .name("ri-requests".to_string())
        .spawn(move || {
            for request in read_requests(BufReader::new(input)) {
                if sender.send(request).is_err() {
                    break;
                }
            }
        })?;

    let storage_root = storage.root().to_path_buf();
    let mut server = RefactoringServer::new(JsonLinesClient::new(output), storage, config)?;
    tracing::info!(storage = %storage_root.display(), "serving requests");
    server.run(requests);

    // The reader ends with its input; an `end` request may leave it blocked.
    drop(reader);
    Ok(server.into_client().into_inner())
}
