//! Session report structures and rendering
//!
//! A report is a pure snapshot of the registry: per managed function its
//! identity, call count, aggregate self time and per-line detail; per native
//! function name, call count and self time. All durations are integer
//! nanoseconds. Maps are ordered so two dumps of the same session serialize
//! byte-identically.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::function::{BaseFunction, Function};
use crate::registry::Registry;

/// Per-line detail of a managed function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineReport {
    /// Source text of the line
    pub line_str: String,
    /// Times execution advanced to this line
    pub n_calls: u64,
    /// Time spent on the line itself (nanoseconds)
    pub internal_ns: u64,
    /// Time folded back from calls the line triggered (nanoseconds)
    pub external_ns: u64,
}

/// Aggregate entry for one callable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionReport {
    /// Display name
    pub name: String,
    /// Completed and in-flight call count
    pub n_calls: u64,
    /// Aggregate self/overhead time (nanoseconds)
    pub internal_ns: u64,
    /// Per-line detail; absent for native callables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<LineReport>>,
}

/// Root report structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Managed functions keyed by code identity
    pub functions: BTreeMap<u64, FunctionReport>,
    /// Native functions keyed by qualified name
    pub c_functions: BTreeMap<String, FunctionReport>,
}

fn duration_ns(duration: std::time::Duration) -> u64 {
    duration.as_nanos() as u64
}

impl FunctionReport {
    fn from_function(function: &Function) -> Self {
        let lines = function
            .lines()
            .iter()
            .map(|record| LineReport {
                line_str: record.text().to_string(),
                n_calls: record.state().n_calls(),
                internal_ns: duration_ns(record.state().internal()),
                external_ns: duration_ns(record.state().external()),
            })
            .collect();

        Self {
            name: function.name().to_string(),
            n_calls: function.n_calls(),
            internal_ns: duration_ns(function.self_time()),
            lines: Some(lines),
        }
    }

    fn from_native(native: &BaseFunction) -> Self {
        Self {
            name: native.name().to_string(),
            n_calls: native.n_calls(),
            internal_ns: duration_ns(native.self_time()),
            lines: None,
        }
    }
}

impl Report {
    /// Snapshot the registry. Read-only; never resets or mutates counters.
    pub(crate) fn collect(registry: &Registry) -> Self {
        let functions = registry
            .functions()
            .map(|f| (f.code().get(), FunctionReport::from_function(f)))
            .collect();
        let c_functions = registry
            .natives()
            .map(|n| (n.name().to_string(), FunctionReport::from_native(n)))
            .collect();

        Self {
            functions,
            c_functions,
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render a human-readable summary, sorted by self time descending.
    ///
    /// With `show_lines`, each managed function is followed by its per-line
    /// breakdown.
    pub fn to_text(&self, show_lines: bool) -> String {
        let mut out = String::new();

        let mut sorted: Vec<_> = self.functions.iter().collect();
        sorted.sort_by(|a, b| b.1.internal_ns.cmp(&a.1.internal_ns));

        let _ = writeln!(
            out,
            "{:<40} {:>10} {:>14}",
            "Function", "Calls", "Self Time"
        );
        let _ = writeln!(out, "{}", "─".repeat(66));
        for (_, function) in &sorted {
            let _ = writeln!(
                out,
                "{:<40} {:>10} {:>13.6}s",
                function.name,
                function.n_calls,
                function.internal_ns as f64 / 1_000_000_000.0
            );
            if show_lines {
                if let Some(lines) = &function.lines {
                    for line in lines {
                        let _ = writeln!(
                            out,
                            "  {:>8} {:>11.6}s {:>11.6}s  {}",
                            line.n_calls,
                            line.internal_ns as f64 / 1_000_000_000.0,
                            line.external_ns as f64 / 1_000_000_000.0,
                            line.line_str.trim_end()
                        );
                    }
                }
            }
        }

        if !self.c_functions.is_empty() {
            let mut natives: Vec<_> = self.c_functions.values().collect();
            natives.sort_by(|a, b| b.internal_ns.cmp(&a.internal_ns));

            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{:<40} {:>10} {:>14}",
                "Native Function", "Calls", "Self Time"
            );
            let _ = writeln!(out, "{}", "─".repeat(66));
            for native in natives {
                let _ = writeln!(
                    out,
                    "{:<40} {:>10} {:>13.6}s",
                    native.name,
                    native.n_calls,
                    native.internal_ns as f64 / 1_000_000_000.0
                );
            }
        }

        out
    }
}
