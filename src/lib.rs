//! Bounded, caching hostname resolution for network scanners.
//!
//! This crate resolves batches of hostnames to single usable IP addresses
//! on behalf of a scanning tool. It is built from a small number of
//! layers, each of which can be used on its own:
//!
//! * [conf] holds the configuration surface: the concurrency ceiling, the
//!   cache capacity and time window, the per-lookup timeout, and the
//!   nameserver bindings for each resolver class.
//! * [backend] performs the actual lookups. The [`Lookup`] trait is the
//!   seam for tests; [`HickoryBackend`] is the real implementation with
//!   one independently configured resolver per class.
//! * [cache] memoizes answers for a bounded time window, keyed by
//!   hostname, class, and a coarse time epoch, collapsing concurrent
//!   lookups for the same key into one backend call.
//! * [resolver] bounds the number of in-flight lookups with a counting
//!   semaphore, applies the forbidden-address predicate, and converts
//!   every per-host failure into a logged, absorbed outcome.
//! * [batch] provides the entry points for callers:
//!   [`Resolver::resolve_all`] for plain hostname lists and
//!   [`Resolver::resolve_all_targets`] for the caller's own target
//!   objects.
//!
//! # Example
//!
//! ```no_run
//! use resolvpool::{Config, HickoryBackend, Resolver};
//!
//! # async fn run() {
//! let config = Config::new();
//! let resolver = Resolver::new(HickoryBackend::from_conf(&config), &config);
//!
//! let mapping = resolver
//!     .resolve_all(&["example.com", "192.0.2.9", "bogus.invalid"])
//!     .await;
//! // Every input is present: resolved hosts map to their address,
//! // literals and unresolvable hosts map to themselves.
//! assert_eq!(mapping.len(), 3);
//! # }
//! ```

pub mod backend;
pub mod batch;
pub mod cache;
pub mod clock;
pub mod conf;
pub mod resolver;

pub use self::backend::{HickoryBackend, Lookup, LookupError};
pub use self::batch::TargetRef;
pub use self::cache::Cache;
pub use self::clock::{Clock, FakeClock, SystemClock};
pub use self::conf::{ClassConf, Config, ResolverClass};
pub use self::resolver::{
    is_forbidden_addr, AddrFilter, Outcome, Resolver, Unresolvable,
};
