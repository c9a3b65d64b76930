//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::{NistItem, RawCandidate, SearchQuery};
use crate::models::hit::lenient;
use crate::parser::ParsedRef;
use crate::sources::{DataSource, SourceError};

/// A mock source serving predefined items from memory.
#[derive(Debug, Default)]
pub struct MockSource {
    items: Mutex<Vec<NistItem>>,
    failure: Mutex<Option<String>>,
    candidate_calls: AtomicUsize,
    materialize_calls: AtomicUsize,
}

impl MockSource {
    /// Create an empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source serving `items`.
    pub fn with_items(items: Vec<NistItem>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    /// Make every candidate lookup fail with a network error.
    pub fn fail_with(&self, message: &str) {
        let mut guard = self.failure.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(message.to_string());
    }

    /// Add an item.
    pub fn push(&self, item: NistItem) {
        let mut guard = self.items.lock().unwrap_or_else(|e| e.into_inner());
        guard.push(item);
    }

    /// Number of `candidates` calls so far
    pub fn candidate_calls(&self) -> usize {
        self.candidate_calls.load(Ordering::SeqCst)
    }

    /// Number of `materialize` calls so far
    pub fn materialize_calls(&self) -> usize {
        self.materialize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    async fn candidates(&self, query: &SearchQuery) -> Result<Vec<RawCandidate>, SourceError> {
        self.candidate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(SourceError::Network(message));
        }

        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let selected = items
            .iter()
            .filter(|item| match (&query.parsed, lenient(item.primary_id().unwrap_or_default())) {
                (ParsedRef::Structured(q), ParsedRef::Structured(c)) => {
                    q.series == c.series && q.code.eq_ignore_ascii_case(&c.code)
                }
                _ => true,
            })
            .map(|item| RawCandidate::Document(Box::new(item.clone())))
            .collect();
        Ok(selected)
    }

    async fn materialize(&self, raw: &RawCandidate) -> Result<NistItem, SourceError> {
        self.materialize_calls.fetch_add(1, Ordering::SeqCst);
        match raw {
            RawCandidate::Document(item) => Ok(item.as_ref().clone()),
            other => Err(SourceError::Parse(format!(
                "mock source cannot materialize {:?}",
                other
            ))),
        }
    }
}
