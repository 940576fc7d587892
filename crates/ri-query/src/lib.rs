pub mod error;
pub mod clang_query;
pub mod config;
pub mod diagnostics;
pub mod gatherer;
pub mod matcher;
pub mod messages;
pub mod symbol_finder;

pub use clang_query::ClangQuery;
pub use config::QueryConfig;
pub use diagnostics::{
    ContextType, DiagnosticContext, DiagnosticMessage, DynamicMatcherDiagnostic,
    DynamicMatcherDiagnostics, ErrorType,
};
pub use error::QueryError;
pub use gatherer::ClangQueryGatherer;
pub use matcher::{matcher_names, parse_matcher_expression, Matcher, NodeKind};
pub use messages::{
    SourceLocationsForRenamingMessage, SourceRangesAndDiagnosticsForQueryMessage,
    SourceRangesForQueryMessage,
};
pub use symbol_finder::SymbolFinder;
