//! Performing the actual lookups.
//!
//! The [`Lookup`] trait is the seam between the resolution pipeline and
//! whatever actually answers queries; the cache and the bounded resolver
//! only ever talk to a `Lookup`. The real implementation is
//! [`HickoryBackend`], which keeps one independently configured
//! [hickory](https://github.com/hickory-dns/hickory-dns) resolver per
//! [`ResolverClass`], built once at startup. Tests drive the pipeline with
//! mock backends instead.

use std::error;
use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{
    NameServerConfig, ResolverConfig, ResolverOpts,
};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{ResolveError, Resolver, TokioResolver};
use tokio::time::timeout;

use crate::conf::{ClassConf, Config, ResolverClass};

//------------ Lookup -----------------------------------------------------------

/// A backend that turns a hostname into a single address.
pub trait Lookup: Send + Sync + 'static {
    /// Looks up the given hostname via the backend bound to `class`.
    ///
    /// Returns the one address the caller should use. Which address that
    /// is when the upstream offers several is the backend's choice; no
    /// attempt is made to pick a "best" record.
    fn lookup<'a>(
        &'a self,
        host: &'a str,
        class: ResolverClass,
    ) -> Pin<Box<dyn Future<Output = Result<IpAddr, LookupError>> + Send + 'a>>;
}

impl<T: Lookup + ?Sized> Lookup for Arc<T> {
    fn lookup<'a>(
        &'a self,
        host: &'a str,
        class: ResolverClass,
    ) -> Pin<Box<dyn Future<Output = Result<IpAddr, LookupError>> + Send + 'a>>
    {
        (**self).lookup(host, class)
    }
}

//------------ HickoryBackend ---------------------------------------------------

/// A lookup backend on top of hickory's stub resolver.
///
/// Each resolver class gets its own resolver instance so the `targets`
/// and `proxies` classes can query different nameserver sets. Every
/// lookup runs under the hard deadline from
/// [`Config::lookup_timeout`][crate::conf::Config::lookup_timeout], so a
/// single unresponsive name cannot stall a whole batch.
pub struct HickoryBackend {
    /// The resolver for the targets class.
    targets: TokioResolver,

    /// The resolver for the proxies class.
    proxies: TokioResolver,

    /// Hard deadline for a single lookup.
    lookup_timeout: Duration,
}

impl HickoryBackend {
    /// Creates a backend from the given configuration.
    pub fn from_conf(config: &Config) -> Self {
        Self {
            targets: build_resolver(
                config.class(ResolverClass::Targets),
                config.lookup_timeout(),
            ),
            proxies: build_resolver(
                config.class(ResolverClass::Proxies),
                config.lookup_timeout(),
            ),
            lookup_timeout: config.lookup_timeout(),
        }
    }

    /// Returns the resolver serving the given class.
    fn resolver(&self, class: ResolverClass) -> &TokioResolver {
        match class {
            ResolverClass::Targets => &self.targets,
            ResolverClass::Proxies => &self.proxies,
        }
    }
}

impl Lookup for HickoryBackend {
    fn lookup<'a>(
        &'a self,
        host: &'a str,
        class: ResolverClass,
    ) -> Pin<Box<dyn Future<Output = Result<IpAddr, LookupError>> + Send + 'a>>
    {
        Box::pin(async move {
            let answer = timeout(
                self.lookup_timeout,
                self.resolver(class).lookup_ip(host),
            )
            .await
            .map_err(|_| LookupError::Timeout)?
            .map_err(|err| LookupError::Upstream(Arc::new(err)))?;

            // Only one answer is needed; the first record wins.
            answer.iter().next().ok_or(LookupError::NoAddresses)
        })
    }
}

/// Builds the nameserver configuration for a single class binding.
///
/// Explicitly configured servers are added first so controlled resolvers
/// are always tried before the stock set, which is appended afterwards
/// when the binding asks for it. A binding without any servers falls back
/// to the stock set alone.
fn build_config(conf: &ClassConf) -> ResolverConfig {
    let mut config = ResolverConfig::new();
    for addr in conf.servers() {
        config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
        config.add_name_server(NameServerConfig::new(*addr, Protocol::Tcp));
    }
    if conf.append_defaults() || conf.servers().is_empty() {
        for server in ResolverConfig::default().name_servers() {
            config.add_name_server(server.clone());
        }
    }
    config
}

/// Builds the resolver for a single class binding.
fn build_resolver(conf: &ClassConf, lookup_timeout: Duration) -> TokioResolver {
    let mut opts = ResolverOpts::default();
    opts.timeout = lookup_timeout;
    // Answers are cached by the cache layer, not by the backend.
    opts.cache_size = 0;
    Resolver::builder_with_config(
        build_config(conf),
        TokioConnectionProvider::default(),
    )
    .with_options(opts)
    .build()
}

//------------ LookupError ------------------------------------------------------

/// An error happened while looking up a hostname.
#[derive(Clone, Debug)]
pub enum LookupError {
    /// The upstream answered but returned no usable address record.
    NoAddresses,

    /// The lookup did not complete within the configured deadline.
    Timeout,

    /// The upstream resolver reported an error.
    Upstream(Arc<ResolveError>),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            LookupError::NoAddresses => {
                write!(f, "answer contained no address records")
            }
            LookupError::Timeout => write!(f, "lookup timed out"),
            LookupError::Upstream(err) => {
                write!(f, "upstream resolver error: {}", err)
            }
        }
    }
}

impl error::Error for LookupError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LookupError::NoAddresses => None,
            LookupError::Timeout => None,
            LookupError::Upstream(err) => Some(err.as_ref()),
        }
    }
}

//============ Tests =============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[test]
    fn configured_servers_come_first() {
        let trusted: SocketAddr = "192.0.2.53:53".parse().unwrap();
        let mut conf = ClassConf::new();
        conf.push_server(trusted);

        let config = build_config(&conf);
        let servers = config.name_servers();
        let stock = ResolverConfig::default().name_servers().len();

        // One UDP and one TCP entry for the trusted server, stock set
        // appended after.
        assert_eq!(servers.len(), 2 + stock);
        assert_eq!(servers[0].socket_addr, trusted);
        assert_eq!(servers[1].socket_addr, trusted);
    }

    #[test]
    fn defaults_can_be_disabled() {
        let trusted: SocketAddr = "192.0.2.53:53".parse().unwrap();
        let mut conf = ClassConf::new();
        conf.push_server(trusted);
        conf.set_append_defaults(false);

        let config = build_config(&conf);
        assert_eq!(config.name_servers().len(), 2);
    }

    #[test]
    fn empty_binding_falls_back_to_stock_set() {
        let mut conf = ClassConf::new();
        conf.set_append_defaults(false);

        let config = build_config(&conf);
        assert!(!config.name_servers().is_empty());
    }
}
