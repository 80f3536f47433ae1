//! A single-flight, time-windowed lookup cache.
//!
//! This module implements a memoizing layer between the resolution
//! pipeline and a [`Lookup`] backend. Entries are keyed by hostname,
//! resolver class, and a coarse epoch number derived from the current
//! time divided by the cache window. Once the window rolls over, requests
//! simply hash to a key nobody has written yet, so entries go stale
//! without any background sweeping; dead entries are reclaimed by the
//! capacity bound and the store's time-to-live.
//!
//! Concurrent requests for the same key collapse into a single backend
//! lookup. Every waiter observes the same result or the same failure,
//! and failures are never stored, so the next request after a failed
//! lookup tries the backend again.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::info;

use crate::backend::{Lookup, LookupError};
use crate::clock::{Clock, SystemClock};
use crate::conf::{Config, ResolverClass};

//------------ Cache ------------------------------------------------------------

/// A cache wrapping a lookup backend.
pub struct Cache<B, C: Clock = SystemClock> {
    /// The backend queried on a miss.
    backend: B,

    /// The cached answers.
    memo: MokaCache<Key, IpAddr>,

    /// How long a cached answer stays fresh.
    window: Duration,

    /// The clock used to derive the current epoch.
    clock: C,
}

impl<B: Lookup> Cache<B> {
    /// Creates a new cache in front of the given backend.
    pub fn new(backend: B, config: &Config) -> Self {
        Self::new_with_clock(backend, config, SystemClock::new())
    }
}

impl<B: Lookup, C: Clock> Cache<B, C> {
    /// Creates a new cache with the given clock.
    pub fn new_with_clock(backend: B, config: &Config, clock: C) -> Self {
        let memo = MokaCache::builder()
            .max_capacity(config.cache_entries())
            .time_to_live(config.cache_window())
            .build();
        Self {
            backend,
            memo,
            window: config.cache_window(),
            clock,
        }
    }

    /// Returns the address for a hostname, looking it up on a miss.
    ///
    /// A hostname that already is an address literal passes through
    /// without touching the cache or the backend. Anything else is served
    /// from the cache when fresh; otherwise exactly one backend lookup
    /// runs per key, no matter how many callers are waiting for it.
    pub async fn get_or_resolve(
        &self,
        host: &str,
        class: ResolverClass,
    ) -> Result<IpAddr, Arc<LookupError>> {
        if let Ok(addr) = host.parse::<IpAddr>() {
            return Ok(addr);
        }
        let key = Key {
            host: host.into(),
            class,
            epoch: self.epoch(),
        };
        self.memo
            .try_get_with(key, async {
                let addr = self.backend.lookup(host, class).await?;
                info!("{} resolved to {} via {}", host, addr, class);
                Ok(addr)
            })
            .await
    }

    /// Returns the current cache epoch.
    fn epoch(&self) -> u64 {
        self.clock.now().as_secs() / self.window.as_secs().max(1)
    }
}

//------------ Key ---------------------------------------------------------------

/// The key for cache entries.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct Key {
    /// The hostname that was looked up.
    host: String,

    /// The resolver class the lookup went through.
    class: ResolverClass,

    /// The cache epoch the entry belongs to.
    epoch: u64,
}

//============ Tests =============================================================
