//! The bounded resolver.
//!
//! [`Resolver`] ties the pieces together: a [`Cache`] in front of a
//! [`Lookup`] backend, a counting semaphore that caps how many lookups
//! are in flight at once, and a forbidden-address predicate applied to
//! every answer. Its [`resolve_one`][Resolver::resolve_one] is the
//! failure-isolation boundary: whatever goes wrong with one hostname is
//! logged and swallowed there, so sibling lookups in the same batch never
//! notice.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::backend::{Lookup, LookupError};
use crate::cache::Cache;
use crate::clock::{Clock, SystemClock};
use crate::conf::{Config, ResolverClass};

//------------ AddrFilter --------------------------------------------------------

/// The forbidden-address predicate.
///
/// Returns true when the given address must never be targeted. The policy
/// itself belongs to the caller and is injected via
/// [`Resolver::with_addr_filter`]; [`is_forbidden_addr`] is the default.
pub type AddrFilter = Arc<dyn Fn(IpAddr) -> bool + Send + Sync>;

/// The default forbidden-address predicate.
///
/// Rejects loopback, unspecified, and link-local addresses.
pub fn is_forbidden_addr(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(addr) => {
            addr.is_loopback()
                || addr.is_unspecified()
                || addr.is_link_local()
        }
        IpAddr::V6(addr) => {
            addr.is_loopback()
                || addr.is_unspecified()
                // fe80::/10, i.e., unicast link-local.
                || (addr.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

//------------ Outcome -----------------------------------------------------------

/// The result of resolving a single hostname.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// The hostname resolved to a usable address.
    Resolved(IpAddr),

    /// The hostname has no usable address.
    Unresolvable(Unresolvable),
}

/// Why a hostname could not be resolved to a usable address.
#[derive(Clone, Debug)]
pub enum Unresolvable {
    /// The lookup failed.
    Lookup(Arc<LookupError>),

    /// The lookup did not complete within its deadline.
    Timeout,

    /// The hostname resolved to an address the filter forbids.
    Forbidden(IpAddr),
}

impl std::fmt::Display for Unresolvable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unresolvable::Lookup(err) => write!(f, "{}", err),
            Unresolvable::Timeout => write!(f, "lookup timed out"),
            Unresolvable::Forbidden(addr) => {
                write!(f, "resolved to forbidden address {}", addr)
            }
        }
    }
}

//------------ Resolver ----------------------------------------------------------

/// A concurrency-bounded, caching, filtering resolver.
pub struct Resolver<B, C: Clock = SystemClock> {
    /// The caching lookup layer.
    cache: Cache<B, C>,

    /// Limits the number of lookups in flight.
    semaphore: Arc<Semaphore>,

    /// The forbidden-address predicate.
    filter: AddrFilter,
}

impl<B: Lookup> Resolver<B> {
    /// Creates a new resolver from a backend and a configuration.
    pub fn new(backend: B, config: &Config) -> Self {
        Self::new_with_clock(backend, config, SystemClock::new())
    }
}

impl<B: Lookup, C: Clock> Resolver<B, C> {
    /// Creates a new resolver with the given clock.
    pub fn new_with_clock(backend: B, config: &Config, clock: C) -> Self {
        Self {
            cache: Cache::new_with_clock(backend, config, clock),
            semaphore: Arc::new(Semaphore::new(config.max_parallel())),
            filter: Arc::new(is_forbidden_addr),
        }
    }

    /// Replaces the forbidden-address predicate.
    pub fn with_addr_filter(mut self, filter: AddrFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Resolves a single hostname, absorbing failures.
    ///
    /// Returns the usable address for the hostname or `None` when the
    /// lookup failed, timed out, or produced a forbidden address. The
    /// failure is logged as a warning; it never propagates, so one bad
    /// hostname cannot abort a batch.
    pub async fn resolve_one(
        &self,
        host: &str,
        class: ResolverClass,
    ) -> Option<IpAddr> {
        match self.outcome(host, class).await {
            Outcome::Resolved(addr) => Some(addr),
            Outcome::Unresolvable(reason) => {
                warn!(
                    "target {} is not available and will not be \
                     targeted ({})",
                    host, reason
                );
                None
            }
        }
    }

    /// Resolves a single hostname into a tagged outcome.
    ///
    /// A limiter permit is held for the duration of the cache and backend
    /// call only; the filter check and everything after it run with the
    /// permit already returned.
    pub async fn outcome(
        &self,
        host: &str,
        class: ResolverClass,
    ) -> Outcome {
        let answer = {
            let _permit = self.get_permit().await;
            self.cache.get_or_resolve(host, class).await
        };
        match answer {
            Ok(addr) => {
                if (self.filter)(addr) {
                    Outcome::Unresolvable(Unresolvable::Forbidden(addr))
                } else {
                    Outcome::Resolved(addr)
                }
            }
            Err(err) => {
                let reason = if matches!(*err, LookupError::Timeout) {
                    Unresolvable::Timeout
                } else {
                    Unresolvable::Lookup(err)
                };
                Outcome::Unresolvable(reason)
            }
        }
    }

    /// Get a permit from the semaphore to start a lookup.
    async fn get_permit(&self) -> OwnedSemaphorePermit {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("the semaphore has not been closed")
    }
}

//============ Tests =============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;

    /// A backend answering from a fixed table.
    struct Table {
        answers: HashMap<String, Result<IpAddr, LookupError>>,
    }

    impl Table {
        fn new(
            answers: &[(&str, Result<IpAddr, LookupError>)],
        ) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(host, res)| (host.to_string(), res.clone()))
                    .collect(),
            }
        }
    }

    impl Lookup for Table {
        fn lookup<'a>(
            &'a self,
            host: &'a str,
            _class: ResolverClass,
        ) -> Pin<
            Box<
                dyn Future<Output = Result<IpAddr, LookupError>> + Send + 'a,
            >,
        > {
            Box::pin(async move {
                self.answers
                    .get(host)
                    .cloned()
                    .unwrap_or(Err(LookupError::NoAddresses))
            })
        }
    }

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn default_filter_rejects_special_ranges() {
        assert!(is_forbidden_addr(addr("127.0.0.1")));
        assert!(is_forbidden_addr(addr("127.8.9.10")));
        assert!(is_forbidden_addr(addr("0.0.0.0")));
        assert!(is_forbidden_addr(addr("169.254.1.1")));
        assert!(is_forbidden_addr(addr("::1")));
        assert!(is_forbidden_addr(addr("::")));
        assert!(is_forbidden_addr(addr("fe80::1")));
        assert!(!is_forbidden_addr(addr("93.184.216.34")));
        assert!(!is_forbidden_addr(addr("2001:db8::7")));
    }

    #[tokio::test]
    async fn resolved_hosts_return_their_address() {
        let backend =
            Table::new(&[("one.example", Ok(addr("192.0.2.1")))]);
        let resolver = Resolver::new(backend, &Config::new());
        assert_eq!(
            resolver.resolve_one("one.example", ResolverClass::Targets).await,
            Some(addr("192.0.2.1"))
        );
    }

    #[tokio::test]
    async fn forbidden_addresses_count_as_failures() {
        let backend =
            Table::new(&[("printer.local", Ok(addr("127.0.0.1")))]);
        let resolver = Resolver::new(backend, &Config::new());
        let outcome = resolver
            .outcome("printer.local", ResolverClass::Targets)
            .await;
        assert!(matches!(
            outcome,
            Outcome::Unresolvable(Unresolvable::Forbidden(_))
        ));
        assert_eq!(
            resolver
                .resolve_one("printer.local", ResolverClass::Targets)
                .await,
            None
        );
    }

    #[tokio::test]
    async fn timeouts_are_tagged_as_timeouts() {
        let backend =
            Table::new(&[("slow.example", Err(LookupError::Timeout))]);
        let resolver = Resolver::new(backend, &Config::new());
        let outcome = resolver
            .outcome("slow.example", ResolverClass::Targets)
            .await;
        assert!(matches!(
            outcome,
            Outcome::Unresolvable(Unresolvable::Timeout)
        ));
    }

    #[tokio::test]
    async fn lookup_failures_return_none() {
        let backend = Table::new(&[]);
        let resolver = Resolver::new(backend, &Config::new());
        assert_eq!(
            resolver
                .resolve_one("bogus.invalid", ResolverClass::Targets)
                .await,
            None
        );
    }

    #[tokio::test]
    async fn filter_can_be_replaced() {
        let backend =
            Table::new(&[("one.example", Ok(addr("192.0.2.1")))]);
        let resolver = Resolver::new(backend, &Config::new())
            .with_addr_filter(Arc::new(|_| true));
        assert_eq!(
            resolver.resolve_one("one.example", ResolverClass::Targets).await,
            None
        );
    }
}
