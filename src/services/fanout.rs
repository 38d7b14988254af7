//! Bounded fan-out for independent per-candidate lookups.

use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;

/// Run `lookup` for every key with at most `limit` calls in flight.
///
/// Results are keyed by their input, so completion order does not matter.
/// Duplicate keys are looked up once.
pub async fn fan_out<K, T, F, Fut>(keys: Vec<K>, limit: usize, lookup: F) -> HashMap<K, T>
where
    K: Eq + Hash + Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = T>,
{
    let mut seen = HashSet::with_capacity(keys.len());
    let unique: Vec<K> = keys.into_iter().filter(|key| seen.insert(key.clone())).collect();

    stream::iter(unique)
        .map(|key| {
            let pending = lookup(key.clone());
            async move { (key, pending.await) }
        })
        .buffer_unordered(limit.max(1))
        .collect::<HashMap<K, T>>()
        .await
}
