//! Resolver configuration.
//!
//! All tunables of the crate live in [`Config`]: the concurrency ceiling,
//! the cache capacity and time window, the per-lookup timeout, and the
//! nameserver bindings for each [`ResolverClass`]. Numeric settings are
//! clamped into a sane range by their `set_*` methods, so a configuration
//! that has been constructed is always usable; rejecting genuinely
//! malformed input is the job of whatever loads the configuration.

use std::cmp;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

//------------ DefMinMax ------------------------------------------------------

/// The default, minimum, and maximum values for a config variable.
#[derive(Clone, Copy)]
struct DefMinMax<T> {
    /// The default value.
    def: T,

    /// The minimum value.
    min: T,

    /// The maximum value.
    max: T,
}

impl<T> DefMinMax<T> {
    /// Creates a new value.
    const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    /// Returns the default value.
    fn default(self) -> T {
        self.def
    }

    /// Trims the given value to fit into the minimum/maximum range.
    fn limit(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }
}

//------------ Configuration Constants -----------------------------------------

/// Configuration limits for the maximum number of parallel lookups.
const MAX_PARALLEL: DefMinMax<usize> = DefMinMax::new(100, 1, 1000);

/// Configuration limits for the maximum number of cached entries.
const CACHE_ENTRIES: DefMinMax<u64> = DefMinMax::new(1024, 1, 1_000_000);

/// Configuration limits for the cache time window.
const CACHE_WINDOW: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(1800),
    Duration::from_secs(1),
    Duration::from_secs(86400),
);

/// Configuration limits for the per-lookup timeout.
const LOOKUP_TIMEOUT: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(3),
    Duration::from_millis(100),
    Duration::from_secs(60),
);

//------------ ResolverClass ----------------------------------------------------

/// Selects which of the configured backends serves a lookup.
///
/// Scan targets and outbound proxy endpoints may need differently tuned
/// nameserver sets, so every lookup names the class it belongs to. The
/// binding for each class lives in [`Config`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResolverClass {
    /// Lookups for scan targets.
    Targets,

    /// Lookups for outbound proxy endpoints.
    Proxies,
}

impl fmt::Display for ResolverClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverClass::Targets => f.write_str("targets"),
            ResolverClass::Proxies => f.write_str("proxies"),
        }
    }
}

//------------ ClassConf --------------------------------------------------------

/// The nameserver binding for a single resolver class.
///
/// Explicitly configured servers are always tried first. When
/// `append_defaults` is set, the stock public-resolver set is appended
/// after them; when it is clear, only the configured servers are used.
/// A binding without any configured servers falls back to the stock set
/// regardless of the flag.
#[derive(Clone, Debug)]
pub struct ClassConf {
    /// Addresses of servers to query, in order of preference.
    servers: Vec<SocketAddr>,

    /// Whether to append the stock resolver set after the servers.
    append_defaults: bool,
}

impl ClassConf {
    /// Creates a new, empty binding.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a server to the end of the configured list.
    pub fn push_server(&mut self, addr: SocketAddr) {
        self.servers.push(addr);
    }

    /// Enables or disables appending the stock resolver set.
    ///
    /// The default value is true (enabled).
    pub fn set_append_defaults(&mut self, value: bool) {
        self.append_defaults = value;
    }

    /// Returns the configured servers.
    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }

    /// Returns whether the stock resolver set is appended.
    pub fn append_defaults(&self) -> bool {
        self.append_defaults
    }
}

impl Default for ClassConf {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            append_defaults: true,
        }
    }
}

//------------ Config -----------------------------------------------------------

/// Configuration of the resolution service.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of lookups in flight at the same time.
    max_parallel: usize,

    /// Maximum number of distinct cached keys.
    cache_entries: u64,

    /// How long a cached answer stays fresh.
    cache_window: Duration,

    /// Hard deadline for a single lookup.
    lookup_timeout: Duration,

    /// Nameserver binding for the targets class.
    targets: ClassConf,

    /// Nameserver binding for the proxies class.
    proxies: ClassConf,
}

impl Config {
    /// Creates a new config with default values.
    ///
    /// The default values are documented at the relevant set_* methods.
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the maximum number of lookups in flight at the same time.
    ///
    /// The value has to be at least one, at most 1000 and the default
    /// is 100.
    pub fn set_max_parallel(&mut self, value: usize) {
        self.max_parallel = MAX_PARALLEL.limit(value)
    }

    /// Set the maximum number of distinct cached keys.
    ///
    /// The value has to be at least one, at most 1,000,000 and the
    /// default is 1024.
    pub fn set_cache_entries(&mut self, value: u64) {
        self.cache_entries = CACHE_ENTRIES.limit(value)
    }

    /// Set how long a cached answer stays fresh.
    ///
    /// The value has to be at least one second, at most 86,400 seconds
    /// (one day) and the default is 1,800 seconds (30 minutes).
    pub fn set_cache_window(&mut self, value: Duration) {
        self.cache_window = CACHE_WINDOW.limit(value)
    }

    /// Set the hard deadline for a single lookup.
    ///
    /// The value has to be at least 100 milliseconds, at most 60 seconds
    /// and the default is 3 seconds.
    pub fn set_lookup_timeout(&mut self, value: Duration) {
        self.lookup_timeout = LOOKUP_TIMEOUT.limit(value)
    }

    /// Returns the maximum number of parallel lookups.
    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Returns the maximum number of distinct cached keys.
    pub fn cache_entries(&self) -> u64 {
        self.cache_entries
    }

    /// Returns the cache time window.
    pub fn cache_window(&self) -> Duration {
        self.cache_window
    }

    /// Returns the per-lookup timeout.
    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    /// Returns the nameserver binding for the given class.
    pub fn class(&self, class: ResolverClass) -> &ClassConf {
        match class {
            ResolverClass::Targets => &self.targets,
            ResolverClass::Proxies => &self.proxies,
        }
    }

    /// Returns a mutable reference to the binding for the given class.
    pub fn class_mut(&mut self, class: ResolverClass) -> &mut ClassConf {
        match class {
            ResolverClass::Targets => &mut self.targets,
            ResolverClass::Proxies => &mut self.proxies,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_parallel: MAX_PARALLEL.default(),
            cache_entries: CACHE_ENTRIES.default(),
            cache_window: CACHE_WINDOW.default(),
            lookup_timeout: LOOKUP_TIMEOUT.default(),
            targets: Default::default(),
            proxies: Default::default(),
        }
    }
}

//============ Tests =============================================================
