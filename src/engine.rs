//! The event dispatcher: attribution state machine over the call stack
//!
//! Every incoming event is processed in two strict phases. First the
//! previous event is *finished*: the interval since it was recorded is
//! attributed to whichever context owns it — a line's internal time, a
//! callee's aggregate, a frame's overhead. Then the new event is *begun*:
//! registry entries are created or bumped, frames are pushed, the line
//! cursor moves. The clock is read again after the begin phase so the
//! dispatch's own cost is excluded from the next measured interval as far
//! as practical; the residue is an accepted measurement bias.

use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{ProfileError, Result};
use crate::event::Event;
use crate::frame::{CallStack, FrameState};
use crate::host::HostRuntime;
use crate::registry::Registry;
use crate::report::Report;

/// Instrumentation-based execution profiler for one host event stream.
///
/// All session state lives on the instance: the persistent registry, the
/// live call stack, and the pending event awaiting its closing attribution.
/// The engine is single-threaded and performs no blocking during dispatch.
pub struct Profiler<H: HostRuntime, C: Clock> {
    host: H,
    clock: C,
    registry: Registry,
    stack: CallStack,
    /// The last begun event, kept until the next arrival finishes it.
    /// `None` means nothing has been observed since construction or stop.
    pending: Option<Event>,
    /// Clock reading taken right after the last begin phase.
    resumed: Duration,
    running: bool,
}

impl<H: HostRuntime, C: Clock> Profiler<H, C> {
    /// Construct an engine over the given host capability and clock.
    ///
    /// Probes the host's introspection facility; an unreachable facility
    /// aborts construction.
    pub fn new(mut host: H, clock: C) -> Result<Self> {
        host.probe()?;
        Ok(Self {
            host,
            clock,
            registry: Registry::new(),
            stack: CallStack::new(),
            pending: None,
            resumed: Duration::ZERO,
            running: false,
        })
    }

    /// Subscribe to the host's event source and begin a session.
    ///
    /// Must only be called with no event in flight.
    pub fn start(&mut self) -> Result<()> {
        self.host.subscribe()?;
        self.pending = Some(Event::Origin);
        self.resumed = self.clock.now();
        self.running = true;
        Ok(())
    }

    /// Detach from the host's event source and cease attribution.
    ///
    /// Frames still on the stack are abandoned: their unflushed
    /// per-invocation time is never merged into the persistent aggregates,
    /// though their call counts were recorded at call time.
    pub fn stop(&mut self) -> Result<()> {
        self.host.unsubscribe()?;
        self.running = false;
        if !self.stack.is_empty() {
            warn!(
                abandoned = self.stack.depth(),
                "stopping with frames in flight; their unflushed time is dropped"
            );
        }
        self.stack.clear();
        self.pending = None;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Live call nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Mutable access to the injected clock, for replay drivers and tests.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Process one event from the host stream.
    ///
    /// Events arriving while the engine is stopped are ignored.
    pub fn dispatch(&mut self, event: Event) -> Result<()> {
        if !self.running {
            return Ok(());
        }

        let arrived = self.clock.now();
        let elapsed = arrived.saturating_sub(self.resumed);
        let previous = self.pending.take();
        self.finish(previous, elapsed)?;
        self.begin(event)?;
        self.resumed = self.clock.now();
        Ok(())
    }

    /// Phase one: attribute the interval since the previous event was
    /// recorded to the context that owns it.
    fn finish(&mut self, previous: Option<Event>, elapsed: Duration) -> Result<()> {
        match previous {
            // Nothing measurable yet, and exceptional exits deliberately
            // drop their interval rather than folding it anywhere.
            None | Some(Event::Origin) | Some(Event::Exception) | Some(Event::NativeException) => {
                Ok(())
            }
            Some(Event::Line { .. }) => {
                // Lines of frames entered before the session started are
                // outside any tracked frame and carry no attribution.
                if let Some(frame) = self.stack.top_mut() {
                    frame.current_line_mut()?.add_internal(elapsed);
                }
                Ok(())
            }
            Some(Event::Call { code }) => {
                // Call-entry overhead, incurred before the callee's first
                // line, is charged to the callee's aggregate self time.
                self.registry.function_mut(code)?.add_self(elapsed);
                Ok(())
            }
            Some(Event::Return) => {
                let frame = self
                    .stack
                    .top_mut()
                    .ok_or(ProfileError::ReturnWithoutCall)?;
                frame.add_overhead(elapsed);
                self.pop_frame()
            }
            Some(Event::NativeCall { name }) => {
                // Whole-call cost is charged twice: to the native callee's
                // aggregate and to the call site's external time.
                self.registry.native_mut(&name)?.add_self(elapsed);
                if let Some(frame) = self.stack.top_mut() {
                    frame.current_line_mut()?.add_external(elapsed);
                }
                Ok(())
            }
            Some(Event::NativeReturn) => {
                if let Some(frame) = self.stack.top_mut() {
                    frame.add_overhead(elapsed);
                }
                Ok(())
            }
        }
    }

    /// Phase two: begin tracking the new event.
    fn begin(&mut self, event: Event) -> Result<()> {
        match &event {
            Event::Call { code } => {
                let function = self.registry.ensure_function(*code, &mut self.host)?;
                function.add_call();
                let frame =
                    FrameState::new(*code, function.first_line(), function.line_count());
                self.stack.push(frame);
            }
            Event::Line { line } => {
                if let Some(frame) = self.stack.top_mut() {
                    frame.set_current_line(*line)?.add_call();
                }
            }
            Event::NativeCall { name } => {
                self.registry.ensure_native(name).add_call();
            }
            // Return, Origin, Exception, NativeReturn and NativeException
            // only mark state; their teardown runs in the next finish.
            _ => {}
        }
        self.pending = Some(event);
        Ok(())
    }

    /// Merge a finished activation into the persistent aggregates and fold
    /// its total observed time into the caller's current line.
    fn pop_frame(&mut self) -> Result<()> {
        let frame = self.stack.pop().ok_or(ProfileError::ReturnWithoutCall)?;
        let function = self.registry.function_mut(frame.code())?;
        function.add_self(frame.overhead());
        function.merge_lines(frame.lines());

        let total = frame.total_time();
        debug!(
            code = frame.code().get(),
            total_ns = total.as_nanos() as u64,
            depth = self.stack.depth(),
            "frame popped"
        );

        if let Some(caller) = self.stack.top_mut() {
            caller.current_line_mut()?.add_external(total);
        }
        Ok(())
    }

    /// Produce the session report: a pure, side-effect-free traversal of
    /// the registry. Repeated calls with no intervening events yield
    /// identical reports.
    pub fn dump(&self) -> Report {
        Report::collect(&self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::CodeId;
    use crate::replay::RecordedHost;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn host_with(sources: &[(u64, u32, &[&str])]) -> RecordedHost {
        let mut table = BTreeMap::new();
        for (code, first_line, lines) in sources {
            table.insert(
                *code,
                crate::replay::RecordedSource {
                    name: format!("fn_{code}"),
                    first_line: *first_line,
                    lines: lines.iter().map(|l| l.to_string()).collect(),
                },
            );
        }
        RecordedHost::new(table)
    }

    fn profiler(sources: &[(u64, u32, &[&str])]) -> Profiler<RecordedHost, ManualClock> {
        let mut p = Profiler::new(host_with(sources), ManualClock::new()).unwrap();
        p.start().unwrap();
        p
    }

    fn step(p: &mut Profiler<RecordedHost, ManualClock>, gap_ns: u64, event: Event) {
        p.clock_mut().advance(Duration::from_nanos(gap_ns));
        p.dispatch(event).unwrap();
    }

    const SRC: (u64, u32, &[&str]) = (1, 10, &["def f():", "    a", "    b"]);

    #[test]
    fn test_dispatch_before_start_is_ignored() {
        let mut p = Profiler::new(host_with(&[SRC]), ManualClock::new()).unwrap();
        p.dispatch(Event::Call {
            code: CodeId::new(1),
        })
        .unwrap();
        assert_eq!(p.depth(), 0);
        assert!(p.dump().functions.is_empty());
    }

    #[test]
    fn test_call_pushes_and_return_pops() {
        let mut p = profiler(&[SRC]);

        step(&mut p, 0, Event::Call { code: CodeId::new(1) });
        assert_eq!(p.depth(), 1);

        step(&mut p, 10, Event::Line { line: 11 });
        step(&mut p, 10, Event::Return);
        step(&mut p, 10, Event::Origin);
        assert_eq!(p.depth(), 0);

        let report = p.dump();
        assert_eq!(report.functions[&1].n_calls, 1);
    }

    #[test]
    fn test_line_events_outside_tracked_frames_are_tolerated() {
        let mut p = profiler(&[SRC]);

        // Lines of the frame that called start() arrive with an empty stack.
        step(&mut p, 5, Event::Line { line: 100 });
        step(&mut p, 5, Event::Line { line: 101 });
        assert_eq!(p.depth(), 0);
        assert!(p.dump().functions.is_empty());
    }

    #[test]
    fn test_return_without_call_fails_loudly() {
        let mut p = profiler(&[SRC]);

        p.dispatch(Event::Return).unwrap();
        p.clock_mut().advance(Duration::from_nanos(5));
        let err = p.dispatch(Event::Origin).unwrap_err();
        assert!(matches!(err, ProfileError::ReturnWithoutCall));
    }

    #[test]
    fn test_unknown_source_surfaces_host_error() {
        let mut p = profiler(&[SRC]);

        let err = p
            .dispatch(Event::Call {
                code: CodeId::new(404),
            })
            .unwrap_err();
        assert!(matches!(err, ProfileError::Host(_)));
    }

    #[test]
    fn test_exception_interval_is_dropped() {
        let mut p = profiler(&[SRC]);

        step(&mut p, 0, Event::Call { code: CodeId::new(1) });
        step(&mut p, 0, Event::Line { line: 11 });
        step(&mut p, 10, Event::Exception);
        // The 50ns spent between Exception and the next event vanish.
        step(&mut p, 50, Event::Line { line: 12 });
        step(&mut p, 0, Event::Return);
        step(&mut p, 0, Event::Origin);

        let report = p.dump();
        let lines = report.functions[&1].lines.as_ref().unwrap();
        assert_eq!(lines[0].internal_ns, 10);
        assert_eq!(lines[1].internal_ns, 0);
    }

    #[test]
    fn test_stop_is_idempotent_on_state() {
        let mut p = profiler(&[SRC]);
        step(&mut p, 0, Event::Call { code: CodeId::new(1) });

        p.stop().unwrap();
        assert!(!p.is_running());
        assert_eq!(p.depth(), 0);

        // Events after stop change nothing.
        p.dispatch(Event::Return).unwrap();
        assert_eq!(p.dump().functions[&1].n_calls, 1);
    }
}
