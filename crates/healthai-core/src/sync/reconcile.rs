//! Per-collection merge policies. All functions are pure.

use std::collections::{HashMap, HashSet};

use crate::models::{AdherenceRecord, Identified, UserProfile};

/// Merge id-keyed records: remote wins for shared ids, local-only records are
/// appended in their local order.
///
/// Result is `remote ∪ (local − remote ids)`. Duplicate ids within one side
/// collapse to their first occurrence.
pub fn reconcile_by_id<T: Identified + Clone>(local: &[T], remote: &[T]) -> Vec<T> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(remote.len() + local.len());
    let mut merged = Vec::with_capacity(remote.len() + local.len());

    for record in remote.iter().chain(local.iter()) {
        if seen.insert(record.id()) {
            merged.push(record.clone());
        }
    }
    merged
}

/// Merge adherence by `(date, medication_id)`: remote first, then local
/// overwrites on the same key. Order follows first appearance of each key.
///
/// Local wins because doses are usually logged offline. A stale local
/// "not taken" can therefore override a correction made on another device.
pub fn reconcile_adherence(
    local: &[AdherenceRecord],
    remote: &[AdherenceRecord],
) -> Vec<AdherenceRecord> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut by_key: HashMap<(String, String), AdherenceRecord> = HashMap::new();

    for record in remote.iter().chain(local.iter()) {
        let key = (record.date.clone(), record.medication_id.clone());
        if by_key.insert(key.clone(), record.clone()).is_none() {
            order.push(key);
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}

/// Singleton: remote wins outright when present.
pub fn reconcile_profile(
    local: Option<UserProfile>,
    remote: Option<UserProfile>,
) -> Option<UserProfile> {
    remote.or(local)
}
