//! Lazy registry of persistent aggregates
//!
//! Two independent mappings: code identity to managed `Function`, qualified
//! name to native `BaseFunction`. Both are populated strictly lazily, on the
//! first observed call. Lookups that the dispatch invariants guarantee must
//! succeed fail loudly when they do not — a missing entry means a call-begin
//! was skipped, and substituting a default would only hide the defect.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::error::ProfileError;
use crate::event::CodeId;
use crate::function::{BaseFunction, Function};
use crate::host::HostRuntime;

/// Session-lifetime store of per-function aggregates.
///
/// Name-based keying of natives cannot disambiguate two distinct callables
/// that format to the same qualified name; their stats merge into one entry.
/// This is a documented limitation of the name key, not a defect.
#[derive(Debug, Default)]
pub struct Registry {
    functions: HashMap<CodeId, Function>,
    natives: HashMap<String, BaseFunction>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the entry for `code`, fetching its source listing through the
    /// host on first sight only.
    pub fn ensure_function<H: HostRuntime>(
        &mut self,
        code: CodeId,
        host: &mut H,
    ) -> Result<&mut Function, ProfileError> {
        match self.functions.entry(code) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let listing = host.source_lines(code)?;
                let function = Function::from_listing(code, listing)?;
                debug!(
                    code = code.get(),
                    name = function.name(),
                    lines = function.line_count(),
                    "registered function"
                );
                Ok(entry.insert(function))
            }
        }
    }

    /// Look up the native entry for `name`, creating it on first sight.
    pub fn ensure_native(&mut self, name: &str) -> &mut BaseFunction {
        self.natives
            .entry(name.to_string())
            .or_insert_with(|| BaseFunction::new(name.to_string()))
    }

    /// Strict lookup for attribution paths where the entry must exist.
    pub fn function_mut(&mut self, code: CodeId) -> Result<&mut Function, ProfileError> {
        self.functions
            .get_mut(&code)
            .ok_or(ProfileError::UnknownFunction(code))
    }

    /// Strict lookup for native attribution paths.
    pub fn native_mut(&mut self, name: &str) -> Result<&mut BaseFunction, ProfileError> {
        self.natives
            .get_mut(name)
            .ok_or_else(|| ProfileError::UnknownNative(name.to_string()))
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn natives(&self) -> impl Iterator<Item = &BaseFunction> {
        self.natives.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostError, SourceListing};

    /// Counting host: hands out a fixed two-body-line listing and records
    /// how many times introspection was hit.
    struct CountingHost {
        lookups: usize,
    }

    impl HostRuntime for CountingHost {
        fn probe(&mut self) -> Result<(), HostError> {
            Ok(())
        }

        fn subscribe(&mut self) -> Result<(), HostError> {
            Ok(())
        }

        fn unsubscribe(&mut self) -> Result<(), HostError> {
            Ok(())
        }

        fn source_lines(&mut self, code: CodeId) -> Result<SourceListing, HostError> {
            self.lookups += 1;
            Ok(SourceListing {
                name: format!("fn_{code}"),
                first_line: 1,
                lines: vec![
                    "def fn():".to_string(),
                    "    a = 1".to_string(),
                    "    return a".to_string(),
                ],
            })
        }
    }

    #[test]
    fn test_ensure_function_fetches_listing_once() {
        let mut registry = Registry::new();
        let mut host = CountingHost { lookups: 0 };
        let code = CodeId::new(5);

        registry.ensure_function(code, &mut host).unwrap();
        registry.ensure_function(code, &mut host).unwrap();
        registry.ensure_function(code, &mut host).unwrap();

        assert_eq!(host.lookups, 1);
        assert_eq!(registry.function_mut(code).unwrap().line_count(), 2);
    }

    #[test]
    fn test_strict_lookup_fails_loudly_when_begin_was_skipped() {
        let mut registry = Registry::new();

        assert!(matches!(
            registry.function_mut(CodeId::new(9)),
            Err(ProfileError::UnknownFunction(_))
        ));
        assert!(matches!(
            registry.native_mut("<native os.getcwd>"),
            Err(ProfileError::UnknownNative(_))
        ));
    }

    #[test]
    fn test_ensure_native_is_lazy_and_idempotent() {
        let mut registry = Registry::new();

        registry.ensure_native("<native builtins.len>").add_call();
        registry.ensure_native("<native builtins.len>").add_call();

        let native = registry.native_mut("<native builtins.len>").unwrap();
        assert_eq!(native.n_calls(), 2);
        assert_eq!(registry.natives().count(), 1);
    }

    #[test]
    fn test_same_name_natives_share_one_entry() {
        let mut registry = Registry::new();

        // Two distinct host callables formatting to the same qualified name
        // land in the same entry; the name key cannot tell them apart.
        registry.ensure_native("<native mod.f>").add_call();
        registry.ensure_native("<native mod.f>").add_call();

        assert_eq!(registry.natives().count(), 1);
        assert_eq!(registry.native_mut("<native mod.f>").unwrap().n_calls(), 2);
    }
}
