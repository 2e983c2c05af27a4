// Offer collection cache
// Sits between the results page and the offer source so that repeated searches
// for the same route and dates skip the simulated supplier round-trip.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::{offer::FlightOffer, query::SearchQuery};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub invalidated_count: usize,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
        }
    }
}

pub trait OfferCache: Send + Sync + 'static {
    // Store the offer collection for a query; `ttl` of None uses the configured default
    fn store(&self, query: &SearchQuery, offers: Arc<[FlightOffer]>, ttl: Option<Duration>);

    // Live entry for the query, if any
    fn get(&self, query: &SearchQuery) -> Option<Arc<[FlightOffer]>>;

    // Drop every entry for a route, optionally narrowed to one departure date.
    // Returns the number of entries removed.
    fn invalidate(&self, origin: &str, destination: &str, depart_date: Option<&str>) -> usize;

    fn stats(&self) -> CacheStats;
}

// Passenger count and trip type do not change the offer collection
pub fn create_cache_key(query: &SearchQuery) -> String {
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    format!(
        "{}:{}:{}:{}",
        query.origin.to_lowercase(),
        query.destination.to_lowercase(),
        date(query.depart_date),
        date(query.return_date)
    )
}

struct CacheEntry {
    offers: Arc<[FlightOffer]>,
    expires_at: Duration,
}

#[derive(Default)]
pub struct TtlOfferCache {
    store: DashMap<String, CacheEntry>,
    config: CacheConfig,
    cache_stats: RwLock<CacheStats>,
    // expiry time -> keys expiring then
    expiry_index: RwLock<BTreeMap<Duration, HashSet<String>>>,
}

impl TtlOfferCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    fn get_current_time() -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }

    fn unindex(&self, key: &str, expires_at: Duration) {
        let mut index = self.expiry_index.write();
        if let Some(keys) = index.get_mut(&expires_at) {
            keys.remove(key);
            if keys.is_empty() {
                index.remove(&expires_at);
            }
        }
    }

    // Remove every entry whose expiry has passed. An index slot can be stale
    // after a concurrent re-store, so the entry's own expiry decides.
    fn cleanup_cache(&self) {
        let now = Self::get_current_time();
        let expired: Vec<String> = {
            let mut index = self.expiry_index.write();
            let live = index.split_off(&now);
            let expired = std::mem::replace(&mut *index, live);
            expired.into_values().flatten().collect()
        };

        if expired.is_empty() {
            return;
        }

        let mut removed = 0;
        for key in &expired {
            if self
                .store
                .remove_if(key, |_, entry| entry.expires_at <= now)
                .is_some()
            {
                removed += 1;
            }
        }

        let mut stats = self.cache_stats.write();
        stats.expired_count += removed;
        stats.items_count = self.store.len();
        debug!(removed, "expired cached offer collections");
    }
}

impl OfferCache for TtlOfferCache {
    fn store(&self, query: &SearchQuery, offers: Arc<[FlightOffer]>, ttl: Option<Duration>) {
        let key = create_cache_key(query);
        let expires_at = Self::get_current_time() + ttl.unwrap_or(self.config.default_ttl);

        if let Some(previous) = self.store.insert(key.clone(), CacheEntry { offers, expires_at }) {
            self.unindex(&key, previous.expires_at);
        }

        self.expiry_index
            .write()
            .entry(expires_at)
            .or_default()
            .insert(key);

        self.cache_stats.write().items_count = self.store.len();
    }

    fn get(&self, query: &SearchQuery) -> Option<Arc<[FlightOffer]>> {
        self.cleanup_cache();

        let key = create_cache_key(query);
        let now = Self::get_current_time();
        let hit = self
            .store
            .get(&key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.offers.clone());

        let mut stats = self.cache_stats.write();
        if hit.is_some() {
            stats.hit_count += 1;
        } else {
            stats.miss_count += 1;
        }
        hit
    }

    fn invalidate(&self, origin: &str, destination: &str, depart_date: Option<&str>) -> usize {
        let prefix = match depart_date {
            Some(date) => format!(
                "{}:{}:{}:",
                origin.to_lowercase(),
                destination.to_lowercase(),
                date
            ),
            None => format!("{}:{}:", origin.to_lowercase(), destination.to_lowercase()),
        };

        let keys: Vec<String> = self
            .store
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.key().to_string())
            .collect();

        let mut removed = 0;
        for key in keys {
            if let Some((key, entry)) = self.store.remove(&key) {
                self.unindex(&key, entry.expires_at);
                removed += 1;
            }
        }

        let mut stats = self.cache_stats.write();
        stats.invalidated_count += removed;
        stats.items_count = self.store.len();

        removed
    }

    fn stats(&self) -> CacheStats {
        self.cache_stats.read().clone()
    }
}
