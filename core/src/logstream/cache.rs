use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// In-memory history keyed by run name.
///
/// The outer map lock is only taken to find or insert a run's entry; appends
/// and reads then go through that run's own lock, so busy runs do not contend
/// with each other. Entries live until `remove` / `clear`, or are trimmed to
/// `max_per_key` records (oldest first) when a cap is configured.
pub struct HistoryCache<T> {
    entries: RwLock<HashMap<String, Arc<Mutex<VecDeque<T>>>>>,
    max_per_key: Option<usize>,
}

impl<T: Clone> HistoryCache<T> {
    pub fn new() -> Self {
        Self::with_limit(None)
    }

    pub fn with_limit(max_per_key: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_per_key: max_per_key.filter(|n| *n > 0),
        }
    }

    fn entry(&self, key: &str) -> Arc<Mutex<VecDeque<T>>> {
        if let Some(e) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return e.clone();
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    pub fn add(&self, key: &str, item: T) {
        let entry = self.entry(key);
        let mut items = entry.lock().unwrap_or_else(PoisonError::into_inner);
        items.push_back(item);
        if let Some(max) = self.max_per_key {
            while items.len() > max {
                items.pop_front();
            }
        }
    }

    /// Full ordered history for `key`; empty when nothing was ever written.
    pub fn get(&self, key: &str) -> Vec<T> {
        let entry = match self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            Some(e) => e.clone(),
            None => return Vec::new(),
        };
        let items = entry.lock().unwrap_or_else(PoisonError::into_inner);
        items.iter().cloned().collect()
    }

    pub fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for HistoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_on_unknown_key_is_empty() {
        let cache: HistoryCache<String> = HistoryCache::new();
        assert!(cache.get("never-written").is_empty());
    }

    #[test]
    fn keeps_insertion_order_per_key() {
        let cache = HistoryCache::new();
        cache.add("a", 1);
        cache.add("b", 10);
        cache.add("a", 2);
        cache.add("a", 3);
        assert_eq!(cache.get("a"), vec![1, 2, 3]);
        assert_eq!(cache.get("b"), vec![10]);
    }

    #[test]
    fn remove_and_clear() {
        let cache = HistoryCache::new();
        cache.add("a", 1);
        cache.add("b", 2);
        cache.remove("a");
        assert!(cache.get("a").is_empty());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("b").is_empty());
    }

    #[test]
    fn limit_drops_oldest() {
        let cache = HistoryCache::with_limit(Some(2));
        for i in 0..5 {
            cache.add("run", i);
        }
        assert_eq!(cache.get("run"), vec![3, 4]);
    }

    #[test]
    fn concurrent_writers_lose_nothing() {
        let cache = Arc::new(HistoryCache::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.add(&format!("run-{}", t % 2), i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.get("run-0").len(), 400);
        assert_eq!(cache.get("run-1").len(), 400);
    }
}
