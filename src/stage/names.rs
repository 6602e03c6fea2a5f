//! Stage name assignment
//!
//! Names are the identity of a stage in the solved manifest, so they are
//! handed out by an explicit generator owned by the caller.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of unique stage names
pub trait NameGenerator: Send + Sync {
    /// Return a name never returned before by this generator
    fn next_name(&self) -> String;
}

/// Counter-backed names: `stage-0`, `stage-1`, ...
#[derive(Debug)]
pub struct SequentialNames {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialNames {
    pub fn new() -> Self {
        Self::with_prefix("stage")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialNames {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator for SequentialNames {
    fn next_name(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Random names: `stage-<uuid>`, unique across generators and processes
#[derive(Debug, Default)]
pub struct UuidNames;

impl NameGenerator for UuidNames {
    fn next_name(&self) -> String {
        format!("stage-{}", uuid::Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sequential_names_count_up() {
        let names = SequentialNames::new();
        assert_eq!(names.next_name(), "stage-0");
        assert_eq!(names.next_name(), "stage-1");
        assert_eq!(names.next_name(), "stage-2");
    }

    #[test]
    fn generators_are_independent() {
        let a = SequentialNames::with_prefix("build");
        let b = SequentialNames::with_prefix("build");
        assert_eq!(a.next_name(), "build-0");
        assert_eq!(b.next_name(), "build-0");
    }

    #[test]
    fn sequential_names_unique_across_threads() {
        let names = std::sync::Arc::new(SequentialNames::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let names = names.clone();
                std::thread::spawn(move || (0..100).map(|_| names.next_name()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(seen.insert(name));
            }
        }
        assert_eq!(seen.len(), 400);
    }

    #[test]
    fn uuid_names_are_manifest_safe() {
        let name = UuidNames.next_name();
        assert!(name.starts_with("stage-"));
        assert!(name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
        assert_ne!(name, UuidNames.next_name());
    }
}
