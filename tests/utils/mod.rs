// Shared helpers for driving a profiler session in integration tests
#![allow(dead_code)] // each test binary uses its own subset

use std::collections::BTreeMap;
use std::time::Duration;

use cronista::clock::ManualClock;
use cronista::engine::Profiler;
use cronista::event::{CodeId, Event};
use cronista::replay::{RecordedHost, RecordedSource};
use cronista::report::Report;

/// A source pool entry: (code id, first line, full listing including the
/// definition header).
pub type SourceSpec = (u64, u32, &'static [&'static str]);

pub fn host_with(sources: &[SourceSpec]) -> RecordedHost {
    let mut table = BTreeMap::new();
    for (code, first_line, lines) in sources {
        table.insert(
            *code,
            RecordedSource {
                name: format!("fn_{code}"),
                first_line: *first_line,
                lines: lines.iter().map(|l| l.to_string()).collect(),
            },
        );
    }
    RecordedHost::new(table)
}

/// A started profiler with explicit clock control.
pub struct Session {
    pub profiler: Profiler<RecordedHost, ManualClock>,
}

impl Session {
    pub fn with_sources(sources: &[SourceSpec]) -> Self {
        let mut profiler = Profiler::new(host_with(sources), ManualClock::new())
            .expect("engine construction");
        profiler.start().expect("start");
        Self { profiler }
    }

    /// Advance the clock by `gap_ns`, then dispatch `event`.
    pub fn after(&mut self, gap_ns: u64, event: Event) -> &mut Self {
        self.profiler
            .clock_mut()
            .advance(Duration::from_nanos(gap_ns));
        self.profiler.dispatch(event).expect("dispatch");
        self
    }

    pub fn dump(&self) -> Report {
        self.profiler.dump()
    }

    pub fn stop(&mut self) {
        self.profiler.stop().expect("stop");
    }

    pub fn depth(&self) -> usize {
        self.profiler.depth()
    }
}

pub fn call(code: u64) -> Event {
    Event::Call {
        code: CodeId::new(code),
    }
}

pub fn line(line: u32) -> Event {
    Event::Line { line }
}

pub fn native(name: &str) -> Event {
    Event::NativeCall {
        name: name.to_string(),
    }
}

pub fn ret() -> Event {
    Event::Return
}

pub fn native_ret() -> Event {
    Event::NativeReturn
}

/// Flush event: finishes whatever is pending without starting new
/// attribution of its own.
pub fn flush() -> Event {
    Event::Origin
}
