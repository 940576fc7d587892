pub mod error;
mod arguments;
mod callbacks;
mod condition;
mod declarations;
mod driver;
mod file_check;
mod macros;
mod preprocessor;
mod registry;
mod source_manager;
mod symbol_table;
mod usr;

pub use arguments::{CompilerInvocation, MacroCommand};
pub use callbacks::{
    DeclId, DeclOccurrence, FileUid, FrontEndCallbacks, InclusionDirective, Location,
    MacroNameToken, OccurrenceRole, SourceFile,
};
pub use driver::{FrontEnd, FrontEndDiagnostic, TranslationUnitSummary, TreeSitterFrontEnd};
pub use file_check::{check_file_size, is_binary};
pub use macros::{MacroDefinition, MacroId, MacroTable};
pub use registry::ParserRegistry;
