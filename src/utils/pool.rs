//! Concurrent execution of async job groups.
//!
//! Callers bound concurrency by sizing the groups they submit.

use std::collections::HashMap;
use std::future::Future;
use tokio::task::{JoinError, JoinSet};

/// Run `job` over every item concurrently and wait for all of them.
///
/// Results come back in submission order; a panicking task yields its
/// `JoinError` in its own slot without affecting siblings.
pub async fn run_group<T, R, F, Fut>(items: Vec<T>, job: F) -> Vec<Result<R, JoinError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let mut join_set = JoinSet::new();
    let mut slots = HashMap::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let handle = join_set.spawn(job(item));
        slots.insert(handle.id(), index);
    }

    let mut joined = Vec::with_capacity(slots.len());
    while let Some(next) = join_set.join_next_with_id().await {
        let (id, value) = match next {
            Ok((id, value)) => (id, Ok(value)),
            Err(err) => (err.id(), Err(err)),
        };
        if let Some(&index) = slots.get(&id) {
            joined.push((index, value));
        }
    }
    joined.sort_by_key(|(index, _)| *index);
    joined.into_iter().map(|(_, value)| value).collect()
}
