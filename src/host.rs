//! Injected host-runtime capability
//!
//! The engine never talks to a concrete language runtime directly. Everything
//! it needs from the host — source introspection and attachment to the event
//! source — is supplied as a capability at construction, which keeps an engine
//! instance self-contained and testable against a fake provider. No session
//! state lives in process-wide globals.

use thiserror::Error;

use crate::event::CodeId;

/// Errors surfaced by a host capability. All of them are fatal.
#[derive(Error, Debug)]
pub enum HostError {
    /// The introspection facility could not be reached.
    #[error("host introspection unavailable: {0}")]
    Unavailable(String),

    /// A name or source listing could not be decoded.
    #[error("malformed host metadata: {0}")]
    BadMetadata(String),

    /// The host has no callable for the requested handle.
    #[error("host knows no callable for code id {0}")]
    UnknownCode(CodeId),
}

/// Full source listing of a managed callable.
///
/// `first_line` is the absolute line number of the first listed line, which
/// is the callable's definition header. Per-line accounting starts at the
/// first body line after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceListing {
    pub name: String,
    pub first_line: u32,
    pub lines: Vec<String>,
}

/// Capability interface to the host language runtime.
///
/// `subscribe`/`unsubscribe` attach and detach one engine instance to the
/// host's event source. Callers must only invoke them at a point with no
/// event in flight.
pub trait HostRuntime {
    /// Verify the introspection facility is reachable.
    ///
    /// Called once at engine construction; failure aborts construction.
    fn probe(&mut self) -> Result<(), HostError>;

    /// Start delivering execution events to the subscribing engine.
    fn subscribe(&mut self) -> Result<(), HostError>;

    /// Stop delivering execution events.
    fn unsubscribe(&mut self) -> Result<(), HostError>;

    /// Fetch the source listing for a callable. Called once per `CodeId`,
    /// on the first observed call.
    fn source_lines(&mut self, code: CodeId) -> Result<SourceListing, HostError>;
}
