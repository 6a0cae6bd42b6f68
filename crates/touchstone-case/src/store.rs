// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-process store of live test cases and the current-case selection.

use std::collections::{BTreeMap, HashMap};
use std::thread::{self, ThreadId};

use crate::error::CaseError;
use crate::testcase::TestCase;

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Policy deciding which test case a capture call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Process-wide: every caller targets the most recently declared case.
    #[default]
    Shared,
    /// Per-caller: each thread of execution has its own current case.
    PerCaller,
}

// ---------------------------------------------------------------------------
// CaseStore
// ---------------------------------------------------------------------------

/// Maps case names to live [`TestCase`]s and resolves the current case.
///
/// Both selection policies are maintained on every `declare` so switching
/// policy never loses the selection state; only resolution differs.
#[derive(Debug, Default)]
pub struct CaseStore {
    selection: Selection,
    cases: BTreeMap<String, TestCase>,
    most_recent: Option<String>,
    per_caller: HashMap<ThreadId, String>,
}

impl CaseStore {
    /// Create an empty store with the given selection policy.
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            ..Self::default()
        }
    }

    /// Declare `name` as the current case for this caller, creating the
    /// case via `make` if it does not exist yet.
    pub fn declare(&mut self, name: &str, make: impl FnOnce() -> TestCase) -> &mut TestCase {
        if !self.cases.contains_key(name) {
            self.cases.insert(name.to_string(), make());
        }
        self.per_caller
            .insert(thread::current().id(), name.to_string());
        self.most_recent = Some(name.to_string());
        self.cases.get_mut(name).expect("case was just inserted")
    }

    /// Drop all data for the named case.
    pub fn forget(&mut self, name: &str) -> Result<(), CaseError> {
        match self.cases.remove(name) {
            Some(_) => Ok(()),
            None => Err(CaseError::NotFound {
                key: name.to_string(),
            }),
        }
    }

    /// Name of the case that captures from this caller currently target.
    pub fn current_name(&self) -> Option<&str> {
        match self.selection {
            Selection::Shared => self.most_recent.as_deref(),
            Selection::PerCaller => self.per_caller.get(&thread::current().id()).map(|s| &**s),
        }
    }

    /// The case that captures from this caller currently target.
    pub fn current_mut(&mut self) -> Option<&mut TestCase> {
        let name = match self.selection {
            Selection::Shared => self.most_recent.clone()?,
            Selection::PerCaller => self.per_caller.get(&thread::current().id())?.clone(),
        };
        self.cases.get_mut(&name)
    }

    /// Look up a case by name.
    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.cases.get(name)
    }

    /// Look up a case by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut TestCase> {
        self.cases.get_mut(name)
    }

    /// Names of all live cases, in name order.
    pub fn names(&self) -> Vec<String> {
        self.cases.keys().cloned().collect()
    }

    /// Iterate over all live cases, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TestCase)> {
        self.cases.iter()
    }

    /// Iterate over all live cases, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut TestCase)> {
        self.cases.iter_mut()
    }

    /// Number of live cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the store holds no cases.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make(name: &str) -> TestCase {
        TestCase::new("acme", "suite", "v1.0", name)
    }

    #[test]
    fn declare_creates_once_and_reuses() {
        let mut store = CaseStore::new(Selection::Shared);
        store.declare("a", || make("a")).add_hit_count("k").unwrap();
        store.declare("a", || make("a")).add_hit_count("k").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("a").unwrap().results()["k"].value.to_string(),
            "2"
        );
    }

    #[test]
    fn shared_selection_tracks_most_recent() {
        let mut store = CaseStore::new(Selection::Shared);
        store.declare("a", || make("a"));
        store.declare("b", || make("b"));
        assert_eq!(store.current_name(), Some("b"));
    }

    #[test]
    fn per_caller_selection_is_thread_local() {
        let mut store = CaseStore::new(Selection::PerCaller);
        store.declare("mine", || make("mine"));
        assert_eq!(store.current_name(), Some("mine"));

        // A thread that never declared a case has no selection.
        let store = std::sync::Mutex::new(store);
        thread::scope(|scope| {
            scope.spawn(|| {
                let guard = store.lock().unwrap();
                assert_eq!(guard.current_name(), None);
            });
        });
    }

    #[test]
    fn per_caller_declare_in_two_threads_is_independent() {
        let store = std::sync::Mutex::new(CaseStore::new(Selection::PerCaller));
        {
            let mut guard = store.lock().unwrap();
            guard.declare("outer", || make("outer"));
        }
        thread::scope(|scope| {
            scope.spawn(|| {
                let mut guard = store.lock().unwrap();
                guard.declare("inner", || make("inner"));
                assert_eq!(guard.current_name(), Some("inner"));
            });
        });
        let guard = store.lock().unwrap();
        assert_eq!(guard.current_name(), Some("outer"));
    }

    #[test]
    fn forget_unknown_case_is_not_found() {
        let mut store = CaseStore::new(Selection::Shared);
        let err = store.forget("ghost").unwrap_err();
        assert_eq!(err, CaseError::NotFound { key: "ghost".into() });
    }

    #[test]
    fn forget_drops_case_data() {
        let mut store = CaseStore::new(Selection::Shared);
        store.declare("a", || make("a"));
        store.forget("a").unwrap();
        assert!(store.is_empty());
        // Selection still names the forgotten case, but resolution is safe.
        assert!(store.current_mut().is_none());
    }

    #[test]
    fn names_are_sorted() {
        let mut store = CaseStore::new(Selection::Shared);
        store.declare("zeta", || make("zeta"));
        store.declare("alpha", || make("alpha"));
        assert_eq!(store.names(), vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
