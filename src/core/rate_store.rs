//! Rate-Limit Store
//!
//! Counter storage behind the rate-limit guard. Injected into the guard
//! rather than reached through a global.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::error::{CoreError, CoreResult};

/// Keyed counters with expiry
pub trait RateLimitStore: Send + Sync {
    /// Current value, if present and not expired
    fn get(&self, key: &str) -> CoreResult<Option<u64>>;

    /// Overwrite a value with a fresh TTL
    fn set(&self, key: &str, value: u64, ttl: Duration) -> CoreResult<()>;

    /// Atomically increment the counter if it is below `limit`.
    ///
    /// Returns whether the increment happened. A missing or expired key
    /// starts a new window of length `ttl`.
    fn increment_below(&self, key: &str, limit: u64, ttl: Duration) -> CoreResult<bool>;
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    value: u64,
    expires_at: Instant,
}

impl Counter {
    fn live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryRateStore {
    counters: Mutex<HashMap<String, Counter>>,
}

impl InMemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CoreResult<std::sync::MutexGuard<'_, HashMap<String, Counter>>> {
        self.counters
            .lock()
            .map_err(|_| CoreError::internal("rate store lock poisoned"))
    }
}

impl RateLimitStore for InMemoryRateStore {
    fn get(&self, key: &str) -> CoreResult<Option<u64>> {
        let now = Instant::now();
        Ok(self
            .lock()?
            .get(key)
            .filter(|c| c.live(now))
            .map(|c| c.value))
    }

    fn set(&self, key: &str, value: u64, ttl: Duration) -> CoreResult<()> {
        self.lock()?.insert(
            key.to_string(),
            Counter {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn increment_below(&self, key: &str, limit: u64, ttl: Duration) -> CoreResult<bool> {
        let now = Instant::now();
        let mut counters = self.lock()?;

        // Drop stale windows so the map does not grow without bound
        counters.retain(|_, c| c.live(now));

        match counters.get_mut(key) {
            Some(counter) if counter.value >= limit => Ok(false),
            Some(counter) => {
                counter.value += 1;
                Ok(true)
            }
            None if limit == 0 => Ok(false),
            None => {
                counters.insert(
                    key.to_string(),
                    Counter {
                        value: 1,
                        expires_at: now + ttl,
                    },
                );
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_get_set() {
        let store = InMemoryRateStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", 4, Duration::from_secs(60)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(4));
    }

    #[test]
    fn test_expired_values_vanish() {
        let store = InMemoryRateStore::new();
        store.set("k", 4, Duration::ZERO).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.increment_below("k", 1, Duration::from_secs(60)).unwrap());
    }

    #[test]
    fn test_increment_stops_at_limit() {
        let store = InMemoryRateStore::new();
        let ttl = Duration::from_secs(60);

        for _ in 0..3 {
            assert!(store.increment_below("k", 3, ttl).unwrap());
        }
        assert!(!store.increment_below("k", 3, ttl).unwrap());
        assert_eq!(store.get("k").unwrap(), Some(3));

        // Other keys are independent
        assert!(store.increment_below("other", 3, ttl).unwrap());
    }

    #[test]
    fn test_concurrent_increments_respect_limit() {
        let store = Arc::new(InMemoryRateStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .filter(|_| {
                            store
                                .increment_below("k", 25, Duration::from_secs(60))
                                .unwrap()
                        })
                        .count()
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 25);
    }
}
