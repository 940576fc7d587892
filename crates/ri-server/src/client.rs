use std::io::Write;

use ri_query::{
    SourceLocationsForRenamingMessage, SourceRangesAndDiagnosticsForQueryMessage,
    SourceRangesForQueryMessage,
};

use crate::protocol::{write_response, Response};

/// Where the server sends its answers.
pub trait RefactoringClient {
    fn source_ranges_and_diagnostics_for_query(
        &mut self,
        message: SourceRangesAndDiagnosticsForQueryMessage,
    );

    fn source_ranges_for_query(&mut self, message: SourceRangesForQueryMessage);

    fn source_locations_for_renaming(&mut self, message: SourceLocationsForRenamingMessage);

    fn progress(&mut self, progress: usize, total: usize);

    /// A request failed. The server keeps running.
    fn error(&mut self, message: String);
}

/// Writes every answer as one JSON line.
pub struct JsonLinesClient<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesClient<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn send(&mut self, response: Response) {
        if let Err(e) = write_response(&mut self.writer, &response) {
            tracing::warn!(error = %e, "cannot write response");
        }
    }
}

impl<W: Write> RefactoringClient for JsonLinesClient<W> {
    fn source_ranges_and_diagnostics_for_query(
        &mut self,
        message: SourceRangesAndDiagnosticsForQueryMessage,
    ) {
        self.send(Response::SourceRangesAndDiagnosticsForQuery(message));
    }

    fn source_ranges_for_query(&mut self, message: SourceRangesForQueryMessage) {
        self.send(Response::SourceRangesForQuery(message));
    }

    fn source_locations_for_renaming(&mut self, message: SourceLocationsForRenamingMessage) {
        self.send(Response::SourceLocationsForRenaming(message));
    }

    fn progress(&mut self, progress: usize, total: usize) {
        self.send(Response::Progress { progress, total });
    }

    fn error(&mut self, message: String) {
        self.send(Response::Error { message });
    }
}

/// Keeps every answer in memory.
#[derive(Debug, Default)]
pub struct RecordingClient {
    pub responses: Vec<Response>,
}

impl RefactoringClient for RecordingClient {
    fn source_ranges_and_diagnostics_for_query(
        &mut self,
        message: SourceRangesAndDiagnosticsForQueryMessage,
    ) {
        self.responses
            .push(Response::SourceRangesAndDiagnosticsForQuery(message));
    }

    fn source_ranges_for_query(&mut self, message: SourceRangesForQueryMessage) {
        self.responses.push(Response::SourceRangesForQuery(message));
    }

    fn source_locations_for_renaming(&mut self, message: SourceLocationsForRenamingMessage) {
        self.responses.push(Response::SourceLocationsForRenaming(message));
    }

    fn progress(&mut self, progress: usize, total: usize) {
        self.responses.push(Response::Progress { progress, total });
    }

    fn error(&mut self, message: String) {
        self.responses.push(Response::Error { message });
    }
}
