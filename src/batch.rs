//! Resolving whole batches of hosts.
//!
//! The entry points for callers live here: [`Resolver::resolve_all`]
//! takes a list of hostname strings and produces a complete mapping,
//! while [`Resolver::resolve_all_targets`] fills the addresses in on the
//! caller's own target objects through the [`TargetRef`] trait.
//!
//! A batch deduplicates its hostnames, passes address literals through
//! untouched, and fans the rest out concurrently under the resolver's
//! shared limiter. The batch always runs to completion: a failing host
//! neither cancels nor fails its siblings, it merely falls back to its
//! own literal value in the result.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use futures_util::future::join_all;

use crate::backend::Lookup;
use crate::clock::Clock;
use crate::conf::ResolverClass;
use crate::resolver::Resolver;

//------------ TargetRef ---------------------------------------------------------

/// Access to the caller's target objects.
///
/// The batch resolver reads the hostname and the resolved flag and writes
/// the address back. Targets that report themselves as already resolved
/// are never touched.
pub trait TargetRef {
    /// Returns the hostname the target points at.
    fn host(&self) -> &str;

    /// Returns whether the target already has a usable address.
    fn is_resolved(&self) -> bool;

    /// Stores the resolved address on the target.
    fn set_addr(&mut self, addr: IpAddr);
}

/// # Batch resolution
///
impl<B: Lookup, C: Clock> Resolver<B, C> {
    /// Resolves every hostname in `hosts` under the targets class.
    ///
    /// Duplicate hostnames are looked up once. Address literals pass
    /// through unchanged without a lookup. The returned mapping has one
    /// entry per input hostname: its resolved address rendered as a
    /// string, or the hostname itself when it could not be resolved,
    /// timed out, or resolved to a forbidden address. Downstream
    /// consumers treat an entry that maps to itself as "use the original
    /// string, or skip".
    pub async fn resolve_all<S: AsRef<str>>(
        &self,
        hosts: &[S],
    ) -> HashMap<String, String> {
        let resolved = self
            .resolve_unique(
                hosts.iter().map(|host| host.as_ref()),
                ResolverClass::Targets,
            )
            .await;
        hosts
            .iter()
            .map(|host| {
                let host = host.as_ref();
                let value = match resolved.get(host).copied().flatten() {
                    Some(addr) => addr.to_string(),
                    None => host.to_string(),
                };
                (host.to_string(), value)
            })
            .collect()
    }

    /// Resolves and stores the address of every unresolved target.
    ///
    /// Targets whose `is_resolved` flag is set are left completely
    /// untouched. Targets whose hostname cannot be resolved keep their
    /// address unset so the caller's own skip logic applies. The slice
    /// order is preserved and addresses are only written once the whole
    /// batch has completed.
    pub async fn resolve_all_targets<T: TargetRef>(
        &self,
        targets: &mut [T],
    ) {
        let resolved = self
            .resolve_unique(
                targets
                    .iter()
                    .filter(|target| !target.is_resolved())
                    .map(|target| target.host()),
                ResolverClass::Targets,
            )
            .await;
        for target in
            targets.iter_mut().filter(|target| !target.is_resolved())
        {
            if let Ok(addr) = target.host().parse::<IpAddr>() {
                target.set_addr(addr);
            } else if let Some(Some(addr)) = resolved.get(target.host()) {
                target.set_addr(*addr);
            }
        }
    }

    /// Resolves each unique non-literal hostname exactly once.
    ///
    /// All lookups run concurrently, gated by the shared limiter, and the
    /// batch waits for every one of them; there is no early cancellation.
    async fn resolve_unique<'a>(
        &self,
        hosts: impl Iterator<Item = &'a str>,
        class: ResolverClass,
    ) -> HashMap<String, Option<IpAddr>> {
        let unique: HashSet<&str> = hosts
            .filter(|host| host.parse::<IpAddr>().is_err())
            .collect();
        let lookups = unique.into_iter().map(|host| async move {
            (host.to_string(), self.resolve_one(host, class).await)
        });
        join_all(lookups).await.into_iter().collect()
    }
}
