// src/services/registry.rs

//! Visit registry.
//!
//! Owns the ordering of visit records and attributes dwell/exit timestamps to a
//! specific visit through an occurrence key (`{region id}-{occurrence}`), so
//! the dwell-time and exit-time maps stay independent of the record list.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{Region, VisitRecord, occurrence_key};
use crate::services::StateStore;
use crate::utils::format_time;

/// Registry of place visits backed by the session state store.
#[derive(Clone)]
pub struct ArticleRegistry {
    store: Arc<StateStore>,
}

impl ArticleRegistry {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Record an entry into `region` now.
    pub fn record_entry(&self, region: &Region) -> VisitRecord {
        self.record_entry_at(region, Utc::now())
    }

    /// Create a visit record at the top of the list and raise the pulse.
    pub fn record_entry_at(&self, region: &Region, at: DateTime<Utc>) -> VisitRecord {
        let record = VisitRecord::entered(self.store.next_id(), region, format_time(at));

        self.store.set_particle_color(record.color);
        self.store.add_article_to_top(record.clone());
        self.store.set_fired(true);

        log::info!("Visit recorded: {} ({})", record.title, record.id);
        record
    }

    pub fn record_dwell(&self, region_id: &str) -> Option<String> {
        self.record_dwell_at(region_id, Utc::now())
    }

    /// Attribute a dwell to the current visit of `region_id`.
    ///
    /// Returns the occurrence key, or `None` when the region has no entry yet.
    pub fn record_dwell_at(&self, region_id: &str, at: DateTime<Utc>) -> Option<String> {
        let (seq, key) = self.resolve(region_id, "dwell")?;
        let time = format_time(at);

        self.store.update_article(seq, |record| {
            record.dwelled_key = key.clone();
            record.dwelled_time = time.clone();
        });
        self.store.set_dwelled_time(key.clone(), time);
        Some(key)
    }

    pub fn record_exit(&self, region_id: &str) -> Option<String> {
        self.record_exit_at(region_id, Utc::now())
    }

    /// Attribute an exit to the current visit of `region_id`.
    ///
    /// Returns the occurrence key, or `None` when the region has no entry yet.
    pub fn record_exit_at(&self, region_id: &str, at: DateTime<Utc>) -> Option<String> {
        let (seq, key) = self.resolve(region_id, "exit")?;
        let time = format_time(at);

        self.store.update_article(seq, |record| {
            record.exited_key = key.clone();
            record.exited_time = time.clone();
        });
        self.store.set_exited_time(key.clone(), time);
        Some(key)
    }

    /// Find the record a dwell/exit belongs to and its occurrence key.
    ///
    /// The occurrence is the number of records sharing the id minus one, taken
    /// at call time; the record is the first match in list order.
    fn resolve(&self, region_id: &str, what: &str) -> Option<(u64, String)> {
        let articles = self.store.articles();
        let count = articles.iter().filter(|a| a.id == region_id).count();
        let Some(record) = articles.iter().find(|a| a.id == region_id) else {
            log::warn!(
                "Ignoring {} for region {}: no entry recorded",
                what,
                region_id
            );
            return None;
        };
        Some((record.seq, occurrence_key(region_id, count - 1)))
    }

    pub fn len(&self) -> usize {
        self.store.articles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use crate::models::property;

    fn region(id: &str, name: &str) -> Region {
        Region::new(
            id,
            geo::polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)],
        )
        .with_property(property::NAME, name)
    }

    fn registry() -> ArticleRegistry {
        ArticleRegistry::new(Arc::new(StateStore::new()))
    }

    #[test]
    fn entry_prepends_one_record() {
        let registry = registry();
        registry.record_entry(&region("a1", "Cafe"));
        assert_eq!(registry.len(), 1);

        registry.record_entry(&region("b2", "Bar"));
        let list = registry.store().articles();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "b2");
        assert_eq!(list[1].id, "a1");
    }

    #[test]
    fn entry_sets_pulse_state() {
        let registry = registry();
        let region = region("a1", "Cafe").with_property(property::GEOFENCE_COLOR, "#112233");
        let record = registry.record_entry(&region);

        let store = registry.store();
        assert!(store.is_fired());
        assert_eq!(store.particle_color(), record.color);
        assert_eq!(store.added_article(), Some(record.clone()));
        assert_eq!(store.is_visible(record.seq), Some(false));
        assert_eq!(store.current_id(), 1);
        assert_eq!(record.title, "Cafe");
        assert!(!record.entered_time.is_empty());
        assert!(record.exited_time.is_empty());
    }

    #[test]
    fn dwell_after_single_entry_keys_zero() {
        let registry = registry();
        registry.record_entry(&region("a1", "Cafe"));

        assert_eq!(registry.record_dwell("a1").as_deref(), Some("a1-0"));
        let dwelled = registry.store().dwelled_times();
        assert_eq!(dwelled.len(), 1);
        assert!(dwelled.contains_key("a1-0"));
        assert_eq!(registry.store().articles()[0].dwelled_key, "a1-0");
    }

    #[test]
    fn exit_keys_exit_map() {
        let registry = registry();
        registry.record_entry(&region("a1", "Cafe"));

        assert_eq!(registry.record_exit("a1").as_deref(), Some("a1-0"));
        let exited = registry.store().exited_times();
        assert!(!exited["a1-0"].is_empty());
        assert!(registry.store().dwelled_times().is_empty());
    }

    #[test]
    fn occurrence_is_count_based() {
        let registry = registry();
        registry.record_entry(&region("a1", "Cafe"));
        registry.record_entry(&region("a1", "Cafe"));

        assert_eq!(registry.record_dwell("a1").as_deref(), Some("a1-1"));
        // the most recent record is first in list order and takes the key
        let list = registry.store().articles();
        assert_eq!(list[0].dwelled_key, "a1-1");
        assert!(list[1].dwelled_key.is_empty());
    }

    #[test]
    fn unknown_region_is_a_no_op() {
        let registry = registry();
        registry.record_entry(&region("a1", "Cafe"));

        assert_eq!(registry.record_dwell("zz"), None);
        assert_eq!(registry.record_exit("zz"), None);
        assert!(registry.store().dwelled_times().is_empty());
        assert!(registry.store().exited_times().is_empty());
    }

    #[test]
    fn parallel_entries_each_add_one_record() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let region = region(&format!("r{}", t), "Cafe");
                    for _ in 0..200 {
                        registry.record_entry(&region);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let list = registry.store().articles();
        assert_eq!(list.len(), 1600);
        let mut seqs: Vec<u64> = list.iter().map(|a| a.seq).collect();
        seqs.sort_unstable();
        assert_eq!(seqs, (0..1600).collect::<Vec<_>>());
        assert_eq!(registry.record_exit("r3").as_deref(), Some("r3-199"));
    }
}
