//! Refactoring backend: serves indexing, query and renaming requests over a
//! JSON-lines protocol.

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod server;

pub use client::{JsonLinesClient, RecordingClient, RefactoringClient};
pub use config::{LogFormat, ServerConfig};
pub use error::ServerError;
pub use protocol::{read_request, read_requests, write_response, ProjectPartMessage, Request, Response};
pub use server::{serve, RefactoringServer};
