//! Event vocabulary shared between the host binding and the engine
//!
//! The host runtime notifies the engine of one event at a time, in strict
//! execution order. Line numbers are absolute within the callable's source
//! file; callables are referenced by a stable opaque handle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, stable handle identifying a callable's compiled body.
///
/// The host guarantees the handle stays valid and is never reused while the
/// profiler still references it. Reusing a handle for a different body while
/// it is referenced by the registry is undefined behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeId(u64);

impl CodeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One notified occurrence from the host's execution stream.
///
/// The engine captures timestamps itself through its injected clock when the
/// event arrives, so events carry no time of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Profiling-session start marker; nothing to measure yet.
    Origin,
    /// Execution advanced to an absolute source line of the innermost frame.
    Line { line: u32 },
    /// A managed callable was entered.
    Call { code: CodeId },
    /// The innermost managed frame is about to exit normally.
    Return,
    /// The innermost managed frame is exiting exceptionally.
    Exception,
    /// A native (opaque, line-less) callable was entered.
    NativeCall { name: String },
    /// The pending native callable returned normally.
    NativeReturn,
    /// The pending native callable exited exceptionally.
    NativeException,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_id_round_trip() {
        let id = CodeId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_code_id_is_map_key_material() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(CodeId::new(7), "f");
        assert_eq!(map.get(&CodeId::new(7)), Some(&"f"));
        assert_eq!(map.get(&CodeId::new(8)), None);
    }

    #[test]
    fn test_code_id_serializes_transparently() {
        let json = serde_json::to_string(&CodeId::new(99)).unwrap();
        assert_eq!(json, "99");
    }
}
