// src/utils/dedup.rs
use std::collections::HashSet;

use crate::models::identity::{Identified, RecordId};

/// Tracks identities already placed somewhere.
///
/// Records without any identity cannot collide, so they are always treated
/// as first sightings.
#[derive(Debug, Default)]
pub struct SeenIds {
    ids: HashSet<RecordId>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time an identity is offered.
    pub fn first_sighting(&mut self, id: Option<&RecordId>) -> bool {
        match id {
            Some(id) => self.ids.insert(id.clone()),
            None => true,
        }
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Union of several record collections, deduplicated by identity.
/// The first copy of a record wins; source order is preserved.
pub fn merge_unique<'a, T, I>(sources: I) -> Vec<&'a T>
where
    T: Identified + 'a,
    I: IntoIterator<Item = &'a [T]>,
{
    let mut seen = SeenIds::new();
    sources
        .into_iter()
        .flatten()
        .filter(|record| seen.first_sighting(record.identity()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ride::RideRecord;

    #[test]
    fn test_first_seen_wins() {
        let offered = vec![
            RideRecord::with_id("1").with_status("scheduled"),
            RideRecord::with_id("2").with_status("in_progress"),
        ];
        let history = vec![
            RideRecord::with_id("2").with_status("completed"),
            RideRecord::with_id("3").with_status("completed"),
        ];

        let merged = merge_unique([offered.as_slice(), history.as_slice()]);
        let statuses: Vec<_> = merged.iter().map(|r| r.raw_status().unwrap()).collect();
        assert_eq!(statuses, vec!["scheduled", "in_progress", "completed"]);
        assert_eq!(merged[2].identity(), Some(&RecordId::from("3")));
    }

    #[test]
    fn test_object_id_fallback_and_anonymous_records() {
        let mut legacy = RideRecord::default();
        legacy.object_id = Some(RecordId::from("1"));
        let rides = vec![
            RideRecord::with_id("1"),
            legacy,
            RideRecord::default(),
            RideRecord::default(),
        ];

        let merged = merge_unique([rides.as_slice()]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_seen_ids() {
        let mut seen = SeenIds::new();
        let id = RecordId::from("r1");
        assert!(seen.first_sighting(Some(&id)));
        assert!(!seen.first_sighting(Some(&id)));
        assert!(seen.first_sighting(None));
        assert!(seen.contains(&id));
        assert_eq!(seen.len(), 1);
    }
}
