//! Volatile job store.
//!
//! A job is written once, after a statement has been processed, and only
//! read afterwards. The store is injected into the processor rather than
//! living in a global, so every test gets a fresh one. Jobs are lost when
//! the process exits.

use crate::output::Transaction;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// A processed statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub transactions: Vec<Transaction>,
    pub csv_content: String,
}

/// Keyed storage for processed statements.
pub trait JobStore: Send + Sync {
    /// A fresh, unguessable identifier.
    fn create_id(&self) -> String;

    /// Store a job under `id`.
    fn put(&self, id: String, transactions: Vec<Transaction>, csv_content: String);

    /// Look a job up. `None` for unknown ids.
    fn get(&self, id: &str) -> Option<Arc<Job>>;
}

/// [`JobStore`] over a reader-writer-locked map.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Arc<Job>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobStore for MemoryJobStore {
    fn create_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn put(&self, id: String, transactions: Vec<Transaction>, csv_content: String) {
        let job = Arc::new(Job {
            transactions,
            csv_content,
        });
        // Entries are plain data; a panicked writer cannot leave one half-built.
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, job);
    }

    fn get(&self, id: &str) -> Option<Arc<Job>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn put_then_get() {
        let store = MemoryJobStore::new();
        let id = store.create_id();
        store.put(id.clone(), Vec::new(), "date,description,amount,type,category\n".into());

        let job = store.get(&id).expect("job stored");
        assert!(job.transactions.is_empty());
        assert!(job.csv_content.starts_with("date,"));
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn ids_are_unique_uuids() {
        let store = MemoryJobStore::new();
        let ids: HashSet<String> = (0..100).map(|_| store.create_id()).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| Uuid::parse_str(id).is_ok()));
    }

    #[test]
    fn concurrent_inserts_and_lookups() {
        let store = Arc::new(MemoryJobStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let id = store.create_id();
                    store.put(id.clone(), Vec::new(), format!("csv {i}"));
                    assert_eq!(store.get(&id).unwrap().csv_content, format!("csv {i}"));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }
}
