use ri_core::{SourceLocationsContainer, SourceRangesContainer};
use serde::{Deserialize, Serialize};

use crate::diagnostics::DynamicMatcherDiagnostics;

/// Result of a query over one file: matches, or why the matcher could not
/// be built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRangesAndDiagnosticsForQueryMessage {
    pub source_ranges: SourceRangesContainer,
    pub diagnostics: DynamicMatcherDiagnostics,
}

/// Matches of one file of a gathered query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRangesForQueryMessage {
    pub source_ranges: SourceRangesContainer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocationsForRenamingMessage {
    pub symbol_name: String,
    pub source_locations: SourceLocationsContainer,
    pub text_document_revision: u32,
}
