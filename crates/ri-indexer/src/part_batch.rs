use std::sync::{Arc, Mutex, PoisonError};

use ri_core::ProjectPartContainer;
use ri_storage::SymbolDatabase;

use crate::collector::CollectedTables;
use crate::error::IndexerError;
use crate::sources_manager::CollectedStamps;

/// The tasks of one project part update. Each task reports through its
/// [`BatchTicket`]; the last report stores every collected table in one
/// immediate transaction.
///
/// A ticket dropped without a report (failed source, replaced or removed
/// task, panic) only stops the batch from waiting for it.
pub struct PartBatch {
    database: Arc<Mutex<SymbolDatabase>>,
    part: Arc<ProjectPartContainer>,
    state: Mutex<BatchState>,
}

struct BatchState {
    outstanding: usize,
    collected: Vec<(CollectedTables, CollectedStamps)>,
}

impl PartBatch {
    pub fn tickets(
        database: Arc<Mutex<SymbolDatabase>>,
        part: Arc<ProjectPartContainer>,
        count: usize,
    ) -> Vec<BatchTicket> {
        let batch = Arc::new(Self {
            database,
            part,
            state: Mutex::new(BatchState {
                outstanding: count,
                collected: Vec::new(),
            }),
        });
        (0..count)
            .map(|_| BatchTicket {
                batch: Some(Arc::clone(&batch)),
            })
            .collect()
    }

    fn report(&self, result: Option<(CollectedTables, CollectedStamps)>) {
        let collected = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.collected.extend(result);
            state.outstanding = state.outstanding.saturating_sub(1);
            if state.outstanding > 0 {
                return;
            }
            std::mem::take(&mut state.collected)
        };
        if collected.is_empty() {
            return;
        }

        let project_part_id = self.part.project_part_id;
        match store(&self.database, &self.part, collected.iter().map(|(tables, _)| tables)) {
            Ok(()) => {
                for (_, stamps) in collected {
                    stamps.confirm();
                }
            }
            Err(e) => {
                tracing::error!(
                    project_part = %project_part_id,
                    sources = collected.len(),
                    error = %e,
                    "indexing transaction rolled back"
                );
            }
        }
    }
}

/// One task's share of a [`PartBatch`].
pub struct BatchTicket {
    batch: Option<Arc<PartBatch>>,
}

impl BatchTicket {
    pub fn submit(mut self, tables: CollectedTables, stamps: CollectedStamps) {
        if let Some(batch) = self.batch.take() {
            batch.report(Some((tables, stamps)));
        }
    }
}

impl Drop for BatchTicket {
    fn drop(&mut self) {
        if let Some(batch) = self.batch.take() {
            batch.report(None);
        }
    }
}

/// Replace the facts of every collected file of a part in one transaction.
/// Files collected by more than one task are written by each in turn; the
/// last write wins. Dropping the transaction on error rolls everything back.
fn store<'a>(
    database: &Mutex<SymbolDatabase>,
    part: &ProjectPartContainer,
    tables: impl Iterator<Item = &'a CollectedTables>,
) -> Result<(), IndexerError> {
    let mut database = database
        .lock()
        .map_err(|_| IndexerError::lock_poisoned("store"))?;
    let transaction = database.begin_immediate()?;
    transaction.insert_or_update_project_part(part)?;

    let (mut files, mut symbols, mut locations) = (0, 0, 0);
    for tables in tables {
        transaction.clear_files(&tables.collected_file_ids())?;
        transaction.add_symbols_and_source_locations(&tables.symbols, &tables.source_locations)?;
        transaction.update_project_part_sources(part.project_part_id, &tables.source_entries)?;
        transaction.insert_used_macros(&tables.used_macros)?;
        transaction.insert_file_statuses(&tables.file_statuses)?;
        transaction.insert_source_dependencies(&tables.source_dependencies)?;
        files += tables.file_statuses.len();
        symbols += tables.symbols.len();
        locations += tables.source_locations.len();
    }
    let orphaned = transaction.remove_orphaned_symbols()?;
    transaction.commit()?;

    tracing::debug!(
        project_part = %part.project_part_id,
        files,
        symbols,
        locations,
        orphaned,
        "indexing transaction committed"
    );
    Ok(())
}
