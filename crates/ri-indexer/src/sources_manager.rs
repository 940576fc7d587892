use std::sync::{Arc, Mutex, PoisonError};

use ri_core::FilePathId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ModifiedTimeStamp {
    file_path_id: FilePathId,
    last_modified: i64,
    has_missing_includes: bool,
}

/// Remembers the modification time of every file a processor has already
/// collected, so unchanged headers are not collected again.
///
/// A collected file is only trusted across tasks once its facts were
/// stored: the stamps of a task travel with its tables as
/// [`CollectedStamps`] and come back through [`CollectedStamps::confirm`].
/// Until then they only count for the task that collected them.
///
/// Every table is sorted by file id.
#[derive(Debug, Default)]
pub struct SourcesManager {
    modified_time_stamps: Vec<ModifiedTimeStamp>,
    collected_time_stamps: Vec<ModifiedTimeStamp>,
    new_modified_time_stamps: Vec<ModifiedTimeStamp>,
    confirmed: Arc<Mutex<Vec<ModifiedTimeStamp>>>,
    dependent_files_modified: bool,
}

impl SourcesManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `file_path_id` was collected at `last_modified` or later.
    ///
    /// A file that is new or newer is recorded as pending and flags the
    /// current translation unit as having modified dependencies.
    pub fn already_parsed(&mut self, file_path_id: FilePathId, last_modified: i64) -> bool {
        match self.known(file_path_id) {
            Some(stamp) if stamp.last_modified >= last_modified => true,
            _ => {
                self.insert_pending(file_path_id, last_modified);
                self.dependent_files_modified = true;
                false
            }
        }
    }

    /// [`Self::already_parsed`], but false as soon as any earlier file of the
    /// translation unit turned out to be modified.
    pub fn already_parsed_all_dependent_files(
        &mut self,
        file_path_id: FilePathId,
        last_modified: i64,
    ) -> bool {
        self.already_parsed(file_path_id, last_modified) && !self.dependent_files_modified
    }

    pub fn dependent_files_modified(&self) -> bool {
        self.dependent_files_modified
    }

    /// Whether a known file has a missing include, directly or through the
    /// files it includes.
    pub fn has_missing_includes(&self, file_path_id: FilePathId) -> bool {
        self.known(file_path_id)
            .is_some_and(|stamp| stamp.has_missing_includes)
    }

    /// Move the stamps of the finished translation unit to the collected
    /// table and start a new one.
    pub fn update_modified_time_stamps(&mut self) {
        let pending = std::mem::take(&mut self.new_modified_time_stamps);
        let collected = std::mem::take(&mut self.collected_time_stamps);
        self.collected_time_stamps = merge(collected, pending);
        self.dependent_files_modified = false;
    }

    /// Record which collected files ended up flagged. `flagged` is sorted.
    pub fn mark_missing_includes(&mut self, flagged: &[FilePathId]) {
        for stamp in &mut self.collected_time_stamps {
            stamp.has_missing_includes = flagged.binary_search(&stamp.file_path_id).is_ok();
        }
    }

    /// Hand the collected stamps over to whoever stores the task's tables.
    pub fn take_collected(&mut self) -> CollectedStamps {
        CollectedStamps {
            stamps: std::mem::take(&mut self.collected_time_stamps),
            confirmed: Arc::clone(&self.confirmed),
        }
    }

    /// Forget what the current task collected.
    pub fn discard_collected(&mut self) {
        self.collected_time_stamps.clear();
        self.new_modified_time_stamps.clear();
        self.dependent_files_modified = false;
    }

    /// Take in the stamps confirmed since the last call.
    pub fn sync_confirmed(&mut self) {
        let mut confirmed = std::mem::take(
            &mut *self
                .confirmed
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if confirmed.is_empty() {
            return;
        }
        confirmed.sort_by(|a, b| {
            a.file_path_id
                .cmp(&b.file_path_id)
                .then(b.last_modified.cmp(&a.last_modified))
        });
        confirmed.dedup_by_key(|stamp| stamp.file_path_id);
        let committed = std::mem::take(&mut self.modified_time_stamps);
        self.modified_time_stamps = merge(committed, confirmed);
    }

    /// The newest stamp of `file_path_id`, committed or collected.
    fn known(&self, file_path_id: FilePathId) -> Option<ModifiedTimeStamp> {
        let find = |table: &[ModifiedTimeStamp]| {
            table
                .binary_search_by_key(&file_path_id, |s| s.file_path_id)
                .ok()
                .map(|index| table[index])
        };
        match (find(&self.collected_time_stamps), find(&self.modified_time_stamps)) {
            (Some(collected), Some(committed)) if committed.last_modified > collected.last_modified => {
                Some(committed)
            }
            (Some(collected), _) => Some(collected),
            (None, committed) => committed,
        }
    }

    fn insert_pending(&mut self, file_path_id: FilePathId, last_modified: i64) {
        let stamp = ModifiedTimeStamp {
            file_path_id,
            last_modified,
            has_missing_includes: false,
        };
        match self
            .new_modified_time_stamps
            .binary_search_by_key(&file_path_id, |s| s.file_path_id)
        {
            Ok(index) => {
                let existing = &mut self.new_modified_time_stamps[index];
                existing.last_modified = existing.last_modified.max(last_modified);
            }
            Err(index) => self.new_modified_time_stamps.insert(index, stamp),
        }
    }
}

/// Merge two sorted tables. On equal ids the newer stamp wins, `new` on a tie.
fn merge(old: Vec<ModifiedTimeStamp>, new: Vec<ModifiedTimeStamp>) -> Vec<ModifiedTimeStamp> {
    let mut merged = Vec::with_capacity(old.len() + new.len());
    let mut old = old.into_iter().peekable();
    let mut new = new.into_iter().peekable();
    loop {
        match (old.peek().copied(), new.peek().copied()) {
            (Some(a), Some(b)) if a.file_path_id < b.file_path_id => {
                merged.extend(old.next());
            }
            (Some(a), Some(b)) if a.file_path_id == b.file_path_id => {
                old.next();
                new.next();
                merged.push(if a.last_modified > b.last_modified { a } else { b });
            }
            (_, Some(_)) => merged.extend(new.next()),
            (Some(_), None) => merged.extend(old.next()),
            (None, None) => break,
        }
    }
    merged
}

/// Stamps of the files one task collected. Dropping them forgets the files;
/// confirming them lets the collector skip the files from now on.
#[derive(Debug)]
pub struct CollectedStamps {
    stamps: Vec<ModifiedTimeStamp>,
    confirmed: Arc<Mutex<Vec<ModifiedTimeStamp>>>,
}

impl CollectedStamps {
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// The facts of these files are stored.
    pub fn confirm(self) {
        if self.stamps.is_empty() {
            return;
        }
        self.confirmed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(self.stamps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_file_is_not_parsed() {
        let mut sources = SourcesManager::new();
        assert!(!sources.already_parsed(FilePathId(3), 100));
        assert!(sources.dependent_files_modified());
    }

    #[test]
    fn committed_file_is_parsed() {
        let mut sources = SourcesManager::new();
        sources.already_parsed(FilePathId(3), 100);
        sources.update_modified_time_stamps();

        assert!(!sources.dependent_files_modified());
        assert!(sources.already_parsed(FilePathId(3), 100));
        assert!(sources.already_parsed(FilePathId(3), 90));
        assert!(!sources.dependent_files_modified());
    }

    #[test]
    fn newer_file_is_not_parsed() {
        let mut sources = SourcesManager::new();
        sources.already_parsed(FilePathId(3), 100);
        sources.update_modified_time_stamps();

        assert!(!sources.already_parsed(FilePathId(3), 101));
        assert!(sources.dependent_files_modified());
    }

    #[test]
    fn pending_is_invisible_until_update() {
        let mut sources = SourcesManager::new();
        assert!(!sources.already_parsed(FilePathId(1), 5));
        assert!(!sources.already_parsed(FilePathId(1), 5));
    }

    #[test]
    fn latest_pending_time_wins() {
        let mut sources = SourcesManager::new();
        sources.already_parsed(FilePathId(2), 50);
        sources.already_parsed(FilePathId(2), 40);
        sources.update_modified_time_stamps();
        assert!(sources.already_parsed(FilePathId(2), 50));
        assert!(!sources.already_parsed(FilePathId(2), 51));
    }

    #[test]
    fn merge_keeps_order_and_replaces() {
        let mut sources = SourcesManager::new();
        for id in [5, 1, 3] {
            sources.already_parsed(FilePathId(id), 10);
        }
        sources.update_modified_time_stamps();
        sources.already_parsed(FilePathId(3), 20);
        sources.already_parsed(FilePathId(4), 20);
        sources.update_modified_time_stamps();

        let ids: Vec<i32> = sources
            .collected_time_stamps
            .iter()
            .map(|s| s.file_path_id.0)
            .collect();
        assert_eq!(ids, vec![1, 3, 4, 5]);
        assert!(sources.already_parsed(FilePathId(3), 20));
    }

    #[test]
    fn modified_dependency_disables_skipping() {
        let mut sources = SourcesManager::new();
        sources.already_parsed(FilePathId(1), 10);
        sources.already_parsed(FilePathId(2), 10);
        sources.update_modified_time_stamps();

        assert!(sources.already_parsed_all_dependent_files(FilePathId(1), 10));
        assert!(!sources.already_parsed_all_dependent_files(FilePathId(3), 10));
        // 2 is unchanged but a file before it in this unit was modified
        assert!(!sources.already_parsed_all_dependent_files(FilePathId(2), 10));
    }

    #[test]
    fn collected_files_are_forgotten_unless_confirmed() {
        let mut sources = SourcesManager::new();
        sources.already_parsed(FilePathId(7), 10);
        sources.update_modified_time_stamps();
        drop(sources.take_collected());
        sources.discard_collected();
        sources.sync_confirmed();
        assert!(!sources.already_parsed(FilePathId(7), 10));

        sources.update_modified_time_stamps();
        let stamps = sources.take_collected();
        assert_eq!(stamps.len(), 1);
        stamps.confirm();
        sources.discard_collected();
        sources.sync_confirmed();
        assert!(sources.already_parsed(FilePathId(7), 10));
    }

    #[test]
    fn missing_include_flag_survives_confirmation() {
        let mut sources = SourcesManager::new();
        sources.already_parsed(FilePathId(1), 10);
        sources.already_parsed(FilePathId(2), 10);
        sources.update_modified_time_stamps();
        sources.mark_missing_includes(&[FilePathId(2)]);
        assert!(sources.has_missing_includes(FilePathId(2)));

        sources.take_collected().confirm();
        sources.sync_confirmed();
        assert!(!sources.has_missing_includes(FilePathId(1)));
        assert!(sources.has_missing_includes(FilePathId(2)));
        assert!(!sources.has_missing_includes(FilePathId(3)));
    }
}
