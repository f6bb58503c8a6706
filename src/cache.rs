use crate::{validation::DataType, ResponseEnvelope};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::debug;

/// How long a stored lookup stays fresh.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Entry count above which `set` sweeps out expired entries.
pub const SWEEP_THRESHOLD: usize = 100;

/// Time source for the cache, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: std::sync::Mutex<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: std::sync::Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *offset += by;
    }
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.origin + *offset
    }
}

struct CacheEntry {
    payload: ResponseEnvelope,
    stored_at: Instant,
}

/// In-memory lookup cache with a single global TTL.
pub struct CacheService {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CacheService {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: CACHE_TTL,
            clock,
        }
    }

    pub fn key(domain: &str, data_type: DataType) -> String {
        format!("{}_{}", domain.to_lowercase(), data_type)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &str) -> Option<ResponseEnvelope> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => {
                debug!("Cache hit for key: {}", key);
                Some(entry.payload.clone())
            }
            Some(_) => {
                entries.remove(key);
                debug!("Cache entry expired for key: {}", key);
                None
            }
            None => {
                debug!("Cache miss for key: {}", key);
                None
            }
        }
    }

    pub async fn set(&self, key: &str, payload: ResponseEnvelope) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        entries.insert(key.to_string(), CacheEntry { payload, stored_at: now });
        debug!("Cached response for key: {}", key);

        if entries.len() > SWEEP_THRESHOLD {
            let before = entries.len();
            let ttl = self.ttl;
            entries.retain(|_, entry| now.duration_since(entry.stored_at) < ttl);
            debug!("Cache sweep evicted {} expired entries", before - entries.len());
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LookupData;
    use crate::extract::ContactInfo;

    fn envelope(domain: &str) -> ResponseEnvelope {
        ResponseEnvelope {
            success: true,
            data_type: DataType::Contact,
            domain: domain.to_string(),
            data: LookupData::Contact(ContactInfo::default()),
            cached: false,
            response_time: 12,
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn cache_with_clock() -> (CacheService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (CacheService::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_key_is_lowercased_and_typed() {
        assert_eq!(CacheService::key("Example.COM", DataType::Domain), "example.com_domain");
        assert_eq!(CacheService::key("example.com", DataType::Contact), "example.com_contact");
    }

    #[tokio::test]
    async fn test_get_returns_fresh_entry() {
        let (cache, clock) = cache_with_clock();
        cache.set("example.com_contact", envelope("example.com")).await;

        clock.advance(Duration::from_secs(299));
        let hit = cache.get("example.com_contact").await;
        assert_eq!(hit.map(|e| e.domain), Some("example.com".to_string()));
    }

    #[tokio::test]
    async fn test_get_evicts_expired_entry() {
        let (cache, clock) = cache_with_clock();
        cache.set("example.com_contact", envelope("example.com")).await;

        clock.advance(CACHE_TTL);
        assert!(cache.get("example.com_contact").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_overwrites_and_restamps() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", envelope("old.com")).await;
        clock.advance(Duration::from_secs(200));
        cache.set("k", envelope("new.com")).await;
        clock.advance(Duration::from_secs(200));

        assert_eq!(cache.get("k").await.map(|e| e.domain), Some("new.com".to_string()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_only_evicts_expired_entries() {
        let (cache, clock) = cache_with_clock();
        for i in 0..60 {
            cache.set(&format!("old{}.com_domain", i), envelope("old.com")).await;
        }
        clock.advance(CACHE_TTL);
        for i in 0..41 {
            cache.set(&format!("new{}.com_domain", i), envelope("new.com")).await;
        }

        // 101st insert triggers the sweep; only the 60 stale entries go
        assert_eq!(cache.len().await, 41);
        assert!(cache.get("new0.com_domain").await.is_some());
    }

    #[tokio::test]
    async fn test_no_sweep_at_threshold() {
        let (cache, clock) = cache_with_clock();
        for i in 0..SWEEP_THRESHOLD {
            cache.set(&format!("d{}.com_domain", i), envelope("d.com")).await;
        }
        clock.advance(CACHE_TTL);
        assert_eq!(cache.len().await, SWEEP_THRESHOLD);
    }

    #[tokio::test]
    async fn test_bounded_under_unique_key_load() {
        let (cache, clock) = cache_with_clock();
        for i in 0..1_000 {
            cache.set(&format!("d{}.com_domain", i), envelope("d.com")).await;
            clock.advance(Duration::from_secs(30));
            // 10 inserts per TTL window plus the sweep keep the store small
            assert!(cache.len().await <= SWEEP_THRESHOLD + 1);
        }
    }
}
