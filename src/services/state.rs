// src/services/state.rs

//! Observable state rendered by the presentation layer.
//!
//! Every field lives in its own `watch` channel. A mutation replaces that
//! field's snapshot and wakes its subscribers; fields are never updated
//! together, so an observer may see `fired` flip before the new record shows
//! up in the visit list, or the other way round.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{Rgb, VisitRecord};

/// Visit records, most recent first.
pub type VisitList = Arc<Vec<VisitRecord>>;

/// Record visibility keyed by `VisitRecord::seq`.
pub type VisibilityMap = Arc<HashMap<u64, bool>>;

/// Occurrence key to local timestamp.
pub type TimeMap = Arc<HashMap<String, String>>;

/// Reactive state containers for one session.
pub struct StateStore {
    show_location_panel: watch::Sender<bool>,
    navigation_ready: watch::Sender<bool>,
    articles: watch::Sender<VisitList>,
    visible_states: watch::Sender<VisibilityMap>,
    is_fired: watch::Sender<bool>,
    particle_color: watch::Sender<Rgb>,
    added_article: watch::Sender<Option<VisitRecord>>,
    id_counter: watch::Sender<u64>,
    dwelled_times: watch::Sender<TimeMap>,
    exited_times: watch::Sender<TimeMap>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            show_location_panel: watch::channel(false).0,
            navigation_ready: watch::channel(false).0,
            articles: watch::channel(VisitList::default()).0,
            visible_states: watch::channel(VisibilityMap::default()).0,
            is_fired: watch::channel(false).0,
            particle_color: watch::channel(Rgb::BLACK).0,
            added_article: watch::channel(None).0,
            id_counter: watch::channel(0).0,
            dwelled_times: watch::channel(TimeMap::default()).0,
            exited_times: watch::channel(TimeMap::default()).0,
        }
    }

    // --- Panel and navigation flags ---

    pub fn set_show_location_panel(&self, show: bool) {
        self.show_location_panel.send_replace(show);
    }

    pub fn show_location_panel(&self) -> bool {
        *self.show_location_panel.borrow()
    }

    pub fn subscribe_show_location_panel(&self) -> watch::Receiver<bool> {
        self.show_location_panel.subscribe()
    }

    pub fn set_navigation_ready(&self, ready: bool) {
        self.navigation_ready.send_replace(ready);
    }

    pub fn navigation_ready(&self) -> bool {
        *self.navigation_ready.borrow()
    }

    pub fn subscribe_navigation_ready(&self) -> watch::Receiver<bool> {
        self.navigation_ready.subscribe()
    }

    // --- Visit records ---

    pub fn articles(&self) -> VisitList {
        Arc::clone(&self.articles.borrow())
    }

    pub fn subscribe_articles(&self) -> watch::Receiver<VisitList> {
        self.articles.subscribe()
    }

    /// Prepend a record, reveal every older record and hide the new one.
    ///
    /// Each field is rewritten under its own channel lock, so concurrent
    /// callers never drop each other's records.
    pub fn add_article_to_top(&self, article: VisitRecord) {
        self.added_article.send_replace(Some(article.clone()));

        let seq = article.seq;
        self.articles.send_modify(|list| {
            let mut next = Vec::with_capacity(list.len() + 1);
            next.push(article);
            next.extend(list.iter().cloned());
            *list = Arc::new(next);
        });

        self.visible_states.send_modify(|map| {
            let map = Arc::make_mut(map);
            map.values_mut().for_each(|visible| *visible = true);
            map.insert(seq, false);
        });
    }

    /// Replace the record with the given `seq` by an updated copy.
    ///
    /// Subscribers holding the previous list keep their snapshot unchanged.
    pub fn update_article(&self, seq: u64, update: impl FnOnce(&mut VisitRecord)) -> bool {
        let mut updated = false;
        self.articles.send_if_modified(|list| {
            let Some(index) = list.iter().position(|a| a.seq == seq) else {
                return false;
            };
            update(&mut Arc::make_mut(list)[index]);
            updated = true;
            true
        });
        updated
    }

    pub fn added_article(&self) -> Option<VisitRecord> {
        self.added_article.borrow().clone()
    }

    pub fn subscribe_added_article(&self) -> watch::Receiver<Option<VisitRecord>> {
        self.added_article.subscribe()
    }

    // --- Visibility ---

    pub fn set_visible(&self, seq: u64, visible: bool) {
        self.visible_states.send_modify(|map| {
            Arc::make_mut(map).insert(seq, visible);
        });
    }

    pub fn is_visible(&self, seq: u64) -> Option<bool> {
        self.visible_states.borrow().get(&seq).copied()
    }

    pub fn visible_states(&self) -> VisibilityMap {
        Arc::clone(&self.visible_states.borrow())
    }

    pub fn subscribe_visible_states(&self) -> watch::Receiver<VisibilityMap> {
        self.visible_states.subscribe()
    }

    // --- Pulse ---

    pub fn set_fired(&self, fired: bool) {
        self.is_fired.send_replace(fired);
    }

    pub fn is_fired(&self) -> bool {
        *self.is_fired.borrow()
    }

    pub fn subscribe_fired(&self) -> watch::Receiver<bool> {
        self.is_fired.subscribe()
    }

    pub fn set_particle_color(&self, color: Rgb) {
        self.particle_color.send_replace(color);
    }

    pub fn particle_color(&self) -> Rgb {
        *self.particle_color.borrow()
    }

    pub fn subscribe_particle_color(&self) -> watch::Receiver<Rgb> {
        self.particle_color.subscribe()
    }

    // --- Id counter ---

    /// Take the current id and advance the counter in one step.
    pub fn next_id(&self) -> u64 {
        let mut claimed = 0;
        self.id_counter.send_modify(|id| {
            claimed = *id;
            *id += 1;
        });
        claimed
    }

    pub fn current_id(&self) -> u64 {
        *self.id_counter.borrow()
    }

    // --- Dwell / exit times ---

    pub fn set_dwelled_time(&self, key: impl Into<String>, time: impl Into<String>) {
        Self::put(&self.dwelled_times, key.into(), time.into());
    }

    pub fn dwelled_times(&self) -> TimeMap {
        Arc::clone(&self.dwelled_times.borrow())
    }

    pub fn subscribe_dwelled_times(&self) -> watch::Receiver<TimeMap> {
        self.dwelled_times.subscribe()
    }

    pub fn set_exited_time(&self, key: impl Into<String>, time: impl Into<String>) {
        Self::put(&self.exited_times, key.into(), time.into());
    }

    pub fn exited_times(&self) -> TimeMap {
        Arc::clone(&self.exited_times.borrow())
    }

    pub fn subscribe_exited_times(&self) -> watch::Receiver<TimeMap> {
        self.exited_times.subscribe()
    }

    fn put(sender: &watch::Sender<TimeMap>, key: String, value: String) {
        sender.send_modify(|map| {
            Arc::make_mut(map).insert(key, value);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seq: u64, id: &str) -> VisitRecord {
        VisitRecord {
            seq,
            id: id.to_string(),
            title: id.to_uppercase(),
            address: String::new(),
            entered_time: "2024/01/01 00:00:00".to_string(),
            exited_key: String::new(),
            exited_time: String::new(),
            dwelled_key: String::new(),
            dwelled_time: String::new(),
            color: Rgb::BLACK,
        }
    }

    #[test]
    fn add_to_top_prepends_and_toggles_visibility() {
        let store = StateStore::new();
        store.add_article_to_top(record(0, "a1"));
        store.add_article_to_top(record(1, "b2"));

        let list = store.articles();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "b2");
        assert_eq!(list[1].id, "a1");
        assert_eq!(store.is_visible(0), Some(true));
        assert_eq!(store.is_visible(1), Some(false));
        assert_eq!(store.added_article().map(|a| a.seq), Some(1));
    }

    #[test]
    fn old_snapshots_are_not_mutated() {
        let store = StateStore::new();
        store.add_article_to_top(record(0, "a1"));
        let before = store.articles();

        assert!(store.update_article(0, |a| a.exited_key = "a1-0".to_string()));
        assert!(before[0].exited_key.is_empty());
        assert_eq!(store.articles()[0].exited_key, "a1-0");
        assert!(!store.update_article(42, |_| {}));
    }

    #[test]
    fn time_maps_accumulate() {
        let store = StateStore::new();
        let old = store.dwelled_times();
        store.set_dwelled_time("a1-0", "t1");
        store.set_dwelled_time("b2-0", "t2");
        store.set_exited_time("a1-0", "t3");

        assert!(old.is_empty());
        assert_eq!(store.dwelled_times().len(), 2);
        assert_eq!(store.exited_times().get("a1-0").map(String::as_str), Some("t3"));
    }

    #[tokio::test]
    async fn subscribers_see_replacements() {
        let store = StateStore::new();
        let mut fired = store.subscribe_fired();
        let mut articles = store.subscribe_articles();

        store.set_fired(true);
        fired.changed().await.unwrap();
        assert!(*fired.borrow_and_update());
        // the list channel is independent of the fired flag
        assert!(!articles.has_changed().unwrap());

        store.add_article_to_top(record(0, "a1"));
        articles.changed().await.unwrap();
        assert_eq!(articles.borrow_and_update().len(), 1);
    }

    #[test]
    fn counter_and_flags() {
        let store = StateStore::new();
        assert_eq!(store.next_id(), 0);
        assert_eq!(store.next_id(), 1);
        assert_eq!(store.current_id(), 2);

        store.set_navigation_ready(true);
        store.set_show_location_panel(true);
        store.set_particle_color(Rgb::new(1, 2, 3));
        assert!(store.navigation_ready());
        assert!(store.show_location_panel());
        assert_eq!(store.particle_color(), Rgb::new(1, 2, 3));
    }

    #[test]
    fn concurrent_writers_keep_every_update() {
        let store = Arc::new(StateStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let seq = store.next_id();
                        store.add_article_to_top(record(seq, "a1"));
                        store.set_dwelled_time(format!("{}-{}", t, i), "t");
                        store.set_visible(seq, true);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.articles().len(), 1600);
        assert_eq!(store.current_id(), 1600);
        assert_eq!(store.dwelled_times().len(), 1600);
        assert_eq!(store.visible_states().len(), 1600);
        let mut seqs: Vec<u64> = store.articles().iter().map(|a| a.seq).collect();
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len(), 1600);
    }
}
