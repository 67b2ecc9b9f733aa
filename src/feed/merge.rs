use std::collections::HashSet;

use crate::models::Photo;

/// Appends `incoming` to `existing`, keeping only the first occurrence of each
/// photo id. Applying the same page twice changes nothing.
pub fn merge(existing: &[Photo], incoming: &[Photo]) -> Vec<Photo> {
    let mut seen = HashSet::with_capacity(existing.len() + incoming.len());
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());

    for photo in existing.iter().chain(incoming) {
        if seen.insert(photo.id.as_str()) {
            merged.push(photo.clone());
        }
    }

    merged
}
