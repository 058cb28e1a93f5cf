//! Recorded-stream replay
//!
//! A capture is a self-contained JSON document holding the source listings
//! of every callable that appears in the stream plus the ordered, timestamped
//! events themselves. Replaying drives a real engine with a `ManualClock`
//! pinned to each event's recorded timestamp, so attribution is exactly
//! reproducible run over run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::ManualClock;
use crate::engine::Profiler;
use crate::error::ProfileError;
use crate::event::{CodeId, Event};
use crate::host::{HostError, HostRuntime, SourceListing};
use crate::report::Report;

/// Source listing of one recorded callable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedSource {
    pub name: String,
    pub first_line: u32,
    pub lines: Vec<String>,
}

/// One recorded event kind with its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordedKind {
    Origin,
    Line { line: u32 },
    Call { code: u64 },
    Return,
    Exception,
    NativeCall { name: String },
    NativeReturn,
    NativeException,
}

/// One recorded event with its absolute monotonic timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Monotonic timestamp in nanoseconds from the capture's origin
    pub at_ns: u64,
    #[serde(flatten)]
    pub kind: RecordedKind,
}

/// A complete captured session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedTrace {
    /// Source listings keyed by code identity
    pub sources: BTreeMap<u64, RecordedSource>,
    /// Ordered event stream
    pub events: Vec<RecordedEvent>,
}

impl From<RecordedKind> for Event {
    fn from(kind: RecordedKind) -> Self {
        match kind {
            RecordedKind::Origin => Event::Origin,
            RecordedKind::Line { line } => Event::Line { line },
            RecordedKind::Call { code } => Event::Call {
                code: CodeId::new(code),
            },
            RecordedKind::Return => Event::Return,
            RecordedKind::Exception => Event::Exception,
            RecordedKind::NativeCall { name } => Event::NativeCall { name },
            RecordedKind::NativeReturn => Event::NativeReturn,
            RecordedKind::NativeException => Event::NativeException,
        }
    }
}

/// Host capability backed by a recorded source table.
///
/// Doubles as the fake provider for engine tests.
#[derive(Debug, Default)]
pub struct RecordedHost {
    sources: BTreeMap<u64, RecordedSource>,
    subscribed: bool,
}

impl RecordedHost {
    pub fn new(sources: BTreeMap<u64, RecordedSource>) -> Self {
        Self {
            sources,
            subscribed: false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}

impl HostRuntime for RecordedHost {
    fn probe(&mut self) -> Result<(), HostError> {
        Ok(())
    }

    fn subscribe(&mut self) -> Result<(), HostError> {
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<(), HostError> {
        self.subscribed = false;
        Ok(())
    }

    fn source_lines(&mut self, code: CodeId) -> Result<SourceListing, HostError> {
        let source = self
            .sources
            .get(&code.get())
            .ok_or(HostError::UnknownCode(code))?;
        Ok(SourceListing {
            name: source.name.clone(),
            first_line: source.first_line,
            lines: source.lines.clone(),
        })
    }
}

/// Replay a captured session through a fresh engine and return its report.
///
/// Frames still open at end-of-stream are abandoned by the closing `stop`,
/// exactly as a live session stopped mid-flight would abandon them.
pub fn replay(trace: RecordedTrace) -> Result<Report, ProfileError> {
    debug!(
        sources = trace.sources.len(),
        events = trace.events.len(),
        "replaying capture"
    );

    let host = RecordedHost::new(trace.sources);
    let mut profiler = Profiler::new(host, ManualClock::new())?;
    profiler.start()?;
    for event in trace.events {
        profiler.clock_mut().set_ns(event.at_ns);
        profiler.dispatch(event.kind.into())?;
    }
    profiler.stop()?;
    Ok(profiler.dump())
}
