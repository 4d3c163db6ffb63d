// # IP-Set Service Trait
//
// Defines the interface to the remote service that stores the managed IP
// set and enforces optimistic locking on writes.
//
// ## Implementations
//
// - AWS WAFv2: `torwaf-provider-wafv2` crate
//
// ## API shape
//
// The three calls mirror what a WAF-style service exposes:
//
// - list IP sets in a scope, one page at a time
// - get one IP set by identity, together with its lock token
// - replace the addresses of an IP set, guarded by the lock token

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment scope of an IP set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// Regional resources (load balancers, API gateways)
    #[serde(alias = "regional")]
    Regional,
    /// Edge distribution resources
    #[serde(alias = "cloudfront")]
    Cloudfront,
}

impl Scope {
    /// Wire name of the scope
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Regional => "REGIONAL",
            Scope::Cloudfront => "CLOUDFRONT",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REGIONAL" => Ok(Scope::Regional),
            "CLOUDFRONT" => Ok(Scope::Cloudfront),
            other => Err(crate::Error::config(format!(
                "Unknown IP set scope '{}'. Valid scopes: REGIONAL, CLOUDFRONT",
                other
            ))),
        }
    }
}

/// Opaque optimistic-lock token
///
/// Invalidated by any successful write. The Debug implementation does not
/// print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    /// Wrap a token returned by the service
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for sending back to the service
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LockToken(<REDACTED>)")
    }
}

/// Name and id of an IP set as returned by a list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpSetSummary {
    /// IP set name
    pub name: String,
    /// Service-assigned id
    pub id: String,
}

/// One page of a list call
#[derive(Debug, Clone, Default)]
pub struct IpSetPage {
    /// IP sets on this page
    pub ip_sets: Vec<IpSetSummary>,
    /// Continuation marker; `None` when this is the last page
    pub next_marker: Option<String>,
}

/// The remote IP set as read at the start of a write attempt
#[derive(Debug, Clone)]
pub struct ManagedIpSet {
    /// IP set name
    pub name: String,
    /// Deployment scope
    pub scope: Scope,
    /// Service-assigned id
    pub id: String,
    /// Current addresses, in CIDR form
    pub addresses: Vec<String>,
    /// Lock token to present on the next write
    pub lock_token: LockToken,
}

/// Full-replace write of an IP set
#[derive(Debug, Clone)]
pub struct IpSetUpdate {
    /// IP set name
    pub name: String,
    /// Deployment scope
    pub scope: Scope,
    /// Service-assigned id
    pub id: String,
    /// Lock token obtained by the preceding read
    pub lock_token: LockToken,
    /// New addresses in CIDR form, sorted lexicographically
    pub addresses: Vec<String>,
}

/// Trait for IP-set service implementations
///
/// # Trust Level: Untrusted
///
/// Providers are thin API adapters.
///
/// ## Allowed Capabilities
/// - ✅ Perform API calls to their service only
/// - ✅ Map service errors onto the crate error taxonomy
///
/// ## Forbidden Capabilities
/// - ❌ Retry on a stale lock token (owned by the caller, and the caller
///   doesn't retry)
/// - ❌ Decide whether an update is needed (owned by `Reconciler`)
/// - ❌ Paginate on their own in `list_ip_sets` (owned by `IpSetLocator`)
///
/// ## Error mapping
///
/// - `get_ip_set` on a missing resource → `Error::NotFound`
/// - `update_ip_set` with a stale token → `Error::ConcurrentModification`
/// - `update_ip_set` rejected otherwise → `Error::Update`
/// - any other list/get failure → `Error::Service`
#[async_trait]
pub trait IpSetService: Send + Sync {
    /// List one page of IP sets in `scope`
    ///
    /// Pass the previous page's `next_marker` to continue.
    async fn list_ip_sets(
        &self,
        scope: Scope,
        next_marker: Option<&str>,
    ) -> Result<IpSetPage, crate::Error>;

    /// Get an IP set and its current lock token
    async fn get_ip_set(
        &self,
        name: &str,
        scope: Scope,
        id: &str,
    ) -> Result<ManagedIpSet, crate::Error>;

    /// Replace all addresses of an IP set
    async fn update_ip_set(&self, update: &IpSetUpdate) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;

    /// Whether `update_ip_set` only pretends to write
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Helper trait for constructing IP-set services from configuration
///
/// Creation is async because service clients usually resolve credentials
/// and endpoints while being built.
#[async_trait]
pub trait IpSetServiceFactory: Send + Sync {
    /// Create an IpSetService instance from configuration
    async fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn IpSetService>, crate::Error>;
}
