use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use ri_core::{
    FilePathCaching, IncludeSearchPath, IncludeSearchPathType, Language, ProjectPartContainer,
    ProjectPartId,
};
use ri_storage::StorageManager;

use crate::config::IndexConfig;
use crate::error::IndexerError;
use crate::indexing::SymbolIndexing;
use crate::report::IndexReport;
use crate::scanner::{scan_files, ScanResult};

/// Project part used for a directory indexed as a whole.
pub const DIRECTORY_PROJECT_PART: ProjectPartId = ProjectPartId(1);

/// Index every C/C++ source under `project_path` as one project part and
/// wait for the result.
///
/// Pipeline: scan → open storage → queue stale sources → run tasks → count.
/// A second run over an unchanged tree finds nothing to do.
#[tracing::instrument(skip(config))]
pub fn index(project_path: &Path, config: &IndexConfig) -> Result<IndexReport, IndexerError> {
    let start = Instant::now();

    let scan = scan_files(project_path);
    tracing::info!(
        sources = scan.sources.len(),
        headers = scan.headers.len(),
        "index started"
    );

    let storage = StorageManager::open(project_path)?;
    let paths = storage.paths().clone();
    let part = directory_project_part(&scan, paths.as_ref());

    let mut indexing = SymbolIndexing::from_storage(
        storage,
        config,
        Box::new(|progress, total| tracing::debug!(progress, total, "indexing progress")),
    )?;
    let state = indexing.update_project_part(part)?;
    indexing.sync();

    let (total_symbols, total_locations) = {
        let database = indexing
            .database()
            .lock()
            .map_err(|_| IndexerError::lock_poisoned("report"))?;
        (database.count_symbols()?, database.count_locations()?)
    };

    let report = IndexReport {
        total_files_scanned: scan.total_entries,
        sources: scan.sources.len(),
        headers: scan.headers.len(),
        state,
        total_symbols,
        total_locations,
        duration: start.elapsed(),
    };
    tracing::info!(
        ?state,
        symbols = report.total_symbols,
        locations = report.total_locations,
        duration_ms = report.duration.as_millis() as u64,
        "index finished"
    );
    Ok(report)
}

/// Every source of the scan, with the directories of its headers as user
/// include paths. C++ unless the tree has C sources only.
pub fn directory_project_part(scan: &ScanResult, paths: &dyn FilePathCaching) -> ProjectPartContainer {
    let source_path_ids = scan
        .sources
        .iter()
        .map(|path| paths.file_path_id(path))
        .collect();
    let header_path_ids = scan
        .headers
        .iter()
        .map(|path| paths.file_path_id(path))
        .collect();

    let header_dirs: BTreeSet<&str> = scan
        .headers
        .iter()
        .filter_map(|path| path.rsplit_once('/').map(|(dir, _)| dir))
        .collect();
    let include_search_paths = header_dirs
        .into_iter()
        .enumerate()
        .map(|(index, dir)| IncludeSearchPath::new(dir, index as u32, IncludeSearchPathType::User))
        .collect();

    let all_c = !scan.sources.is_empty() && scan.sources.iter().all(|path| path.ends_with(".c"));

    let mut part = ProjectPartContainer::new(DIRECTORY_PROJECT_PART, source_path_ids);
    part.header_path_ids = header_path_ids;
    part.include_search_paths = include_search_paths;
    part.language = if all_c { Language::C } else { Language::Cxx };
    part
}
