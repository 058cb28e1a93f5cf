//! Persistent per-function aggregates
//!
//! Entries live for the whole session and only ever grow. `BaseFunction`
//! covers native callables tracked at whole-call granularity; `Function`
//! adds the per-line table for managed callables with visible source.

use std::time::Duration;

use crate::event::CodeId;
use crate::host::{HostError, SourceListing};
use crate::line_stats::{LineRecord, LineState};

/// Session-lifetime aggregate for a callable with no visible lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseFunction {
    name: String,
    n_calls: u64,
    self_time: Duration,
}

impl BaseFunction {
    pub fn new(name: String) -> Self {
        Self {
            name,
            n_calls: 0,
            self_time: Duration::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_call(&mut self) {
        self.n_calls += 1;
    }

    pub fn n_calls(&self) -> u64 {
        self.n_calls
    }

    /// Add time attributed to the callable itself rather than to any line:
    /// whole native calls, call-entry overhead, call-exit overhead.
    pub fn add_self(&mut self, elapsed: Duration) {
        self.self_time += elapsed;
    }

    pub fn self_time(&self) -> Duration {
        self.self_time
    }
}

/// Session-lifetime aggregate for a managed callable, with one persistent
/// `LineRecord` per body line.
///
/// The line table is laid out once, from the first observed invocation. The
/// first listed source line is the definition header and gets no record;
/// absolute line `L` maps to index `L - first_line - 1`. A later invocation
/// with a different body is out of scope for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    base: BaseFunction,
    code: CodeId,
    first_line: u32,
    lines: Vec<LineRecord>,
}

impl Function {
    /// Build the persistent entry from a host source listing.
    ///
    /// An empty listing means the host handed back metadata it could not
    /// decode, which is fatal.
    pub fn from_listing(code: CodeId, listing: SourceListing) -> Result<Self, HostError> {
        if listing.lines.is_empty() {
            return Err(HostError::BadMetadata(format!(
                "empty source listing for `{}` (code id {code})",
                listing.name
            )));
        }

        let lines = listing
            .lines
            .into_iter()
            .skip(1)
            .map(LineRecord::new)
            .collect();

        Ok(Self {
            base: BaseFunction::new(listing.name),
            code,
            first_line: listing.first_line,
            lines,
        })
    }

    pub fn code(&self) -> CodeId {
        self.code
    }

    pub fn first_line(&self) -> u32 {
        self.first_line
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[LineRecord] {
        &self.lines
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn add_call(&mut self) {
        self.base.add_call();
    }

    pub fn n_calls(&self) -> u64 {
        self.base.n_calls()
    }

    pub fn add_self(&mut self, elapsed: Duration) {
        self.base.add_self(elapsed);
    }

    pub fn self_time(&self) -> Duration {
        self.base.self_time()
    }

    /// Merge one popped activation's ephemeral line states into the
    /// persistent records, index by index.
    pub fn merge_lines(&mut self, states: &[LineState]) {
        for (record, state) in self.lines.iter_mut().zip(states) {
            *record += state;
        }
    }
}
