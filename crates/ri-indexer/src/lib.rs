pub mod error;
pub mod collector;
pub mod command_line;
pub mod config;
pub mod file_status_cache;
pub mod generated_files;
pub mod indexing;
pub mod part_batch;
pub mod pipeline;
pub mod processor_manager;
pub mod progress_counter;
pub mod report;
pub mod scanner;
pub mod sources_manager;
pub mod symbol_indexer;
pub mod task_queue;
pub mod task_scheduler;
pub mod watcher;

pub use collector::{CollectedTables, SymbolsCollector, SymbolsCollectorFactory};
pub use config::{IndexConfig, LaunchPolicy};
pub use error::IndexerError;
pub use file_status_cache::FileStatusCache;
pub use generated_files::GeneratedFiles;
pub use indexing::SymbolIndexing;
pub use pipeline::{directory_project_part, index, DIRECTORY_PROJECT_PART};
pub use processor_manager::{Processor, ProcessorFactory, ProcessorManager};
pub use progress_counter::{ProgressCallback, ProgressCounter};
pub use report::IndexReport;
pub use scanner::{scan_files, ScanResult};
pub use part_batch::{BatchTicket, PartBatch};
pub use sources_manager::{CollectedStamps, SourcesManager};
pub use symbol_indexer::{IndexerTask, IndexerTaskQueue, ReindexState, SymbolIndexer};
pub use task_queue::{SymbolIndexerTask, SymbolIndexerTaskQueue};
pub use task_scheduler::{SlotUsage, Task, TaskScheduler, TaskSchedulerInterface};
pub use watcher::{start_watching, ChangeEvent, WatcherHandle};
