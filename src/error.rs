//! Error types for the profiling engine
//!
//! There are no retries anywhere: this is a synchronous single-pass
//! accounting engine, so any inconsistency indicates a tracking defect
//! rather than a transient condition.

use thiserror::Error;

use crate::event::CodeId;
use crate::host::HostError;

/// Errors that can occur while attributing an event stream
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The host introspection capability failed or returned bad metadata.
    #[error(transparent)]
    Host(#[from] HostError),

    /// An event referenced a callable that was never registered. The
    /// registry is populated on every Call begin, so absence means a Call
    /// event was skipped upstream.
    #[error("no function registered for code id {0}")]
    UnknownFunction(CodeId),

    /// A native event referenced a name that was never registered.
    #[error("no native function registered under `{0}`")]
    UnknownNative(String),

    /// A line event fell outside the line range recorded for the callable.
    #[error("line {line} outside the recorded range of code id {code}")]
    LineOutOfRange { code: CodeId, line: u32 },

    /// Attribution required a current line, but no line event has been
    /// observed in the frame yet.
    #[error("no line observed yet in the active frame of code id {0}")]
    NoActiveLine(CodeId),

    /// A return event arrived with no frame on the call stack.
    #[error("return event with no active frame on the call stack")]
    ReturnWithoutCall,
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, ProfileError>;
