//! Ephemeral activation state and the call stack
//!
//! One `FrameState` exists per live activation, from Call begin to the
//! matching Return finish. Recursion is represented by multiple frames for
//! the same `CodeId` on the stack. A frame never survives its pop: its
//! accumulators are merged into the persistent function entry and the frame
//! is discarded.

use std::time::Duration;

use crate::error::ProfileError;
use crate::event::CodeId;
use crate::line_stats::LineState;

/// One active invocation: line cursor, per-line ephemeral accumulators and
/// the frame-level overhead accumulator.
#[derive(Debug)]
pub struct FrameState {
    code: CodeId,
    first_line: u32,
    cursor: Option<usize>,
    lines: Vec<LineState>,
    overhead: Duration,
}

impl FrameState {
    pub fn new(code: CodeId, first_line: u32, n_lines: usize) -> Self {
        Self {
            code,
            first_line,
            cursor: None,
            lines: vec![LineState::new(); n_lines],
            overhead: Duration::ZERO,
        }
    }

    pub fn code(&self) -> CodeId {
        self.code
    }

    /// Move the cursor to an absolute line number and return its state.
    ///
    /// Index layout matches the persistent table: absolute line `L` maps to
    /// `L - first_line - 1`. A line outside the recorded range is an
    /// invariant violation, not something to clamp.
    pub fn set_current_line(&mut self, line: u32) -> Result<&mut LineState, ProfileError> {
        let index = (line as usize)
            .checked_sub(self.first_line as usize + 1)
            .filter(|&i| i < self.lines.len())
            .ok_or(ProfileError::LineOutOfRange {
                code: self.code,
                line,
            })?;
        self.cursor = Some(index);
        Ok(&mut self.lines[index])
    }

    /// The line the frame is currently executing.
    ///
    /// Errors when no line event has been observed in this frame yet; the
    /// host contract makes a line event the first thing a frame sees, so a
    /// missing cursor means attribution went off the rails.
    pub fn current_line_mut(&mut self) -> Result<&mut LineState, ProfileError> {
        match self.cursor {
            Some(index) => Ok(&mut self.lines[index]),
            None => Err(ProfileError::NoActiveLine(self.code)),
        }
    }

    /// Add call-transition time that belongs to the frame as a whole rather
    /// than to any line.
    pub fn add_overhead(&mut self, elapsed: Duration) {
        self.overhead += elapsed;
    }

    pub fn overhead(&self) -> Duration {
        self.overhead
    }

    pub fn lines(&self) -> &[LineState] {
        &self.lines
    }

    /// Total observed time of the activation: the sum of internal and
    /// external time over all its lines.
    pub fn total_time(&self) -> Duration {
        self.lines.iter().map(LineState::total).sum()
    }
}

/// LIFO sequence of live activations; top is the innermost one.
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<FrameState>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: FrameState) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<FrameState> {
        self.frames.pop()
    }

    pub fn top_mut(&mut self) -> Option<&mut FrameState> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drop all live frames without merging them anywhere. Used when the
    /// session stops with calls still in flight.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
