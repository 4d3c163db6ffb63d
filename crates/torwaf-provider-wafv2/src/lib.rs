// # AWS WAFv2 IP-Set Provider
//
// This crate provides the AWS WAFv2 implementation of `IpSetService`.
//
// ## Behavior
//
// - ✅ One API call per trait method (ListIPSets, GetIPSet, UpdateIPSet)
// - ✅ Optimistic-lock failures surface as `Error::ConcurrentModification`
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (a stale token fails the run)
// - ❌ NO pagination loop (owned by `IpSetLocator`)
// - ❌ NO diffing (owned by `Reconciler`)
//
// ## Trust Level: Untrusted (IP-Set Service)
//
// **Allowed Capabilities**:
// - ✅ Perform WAFv2 API calls in the configured region only
// - ✅ Map SDK errors onto the torwaf error taxonomy
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Cache IP sets or lock tokens between calls
//
// ## Credentials
//
// Credentials come from the standard AWS provider chain (environment,
// profile, instance or task role). They are never read or logged here.
//
// ## Scope and region
//
// CLOUDFRONT-scoped IP sets only exist in us-east-1. That combination is
// checked by `SyncConfig::validate`, not by this crate.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_wafv2::error::DisplayErrorContext;
use aws_sdk_wafv2::types::Scope as WafScope;
use torwaf_core::ComponentRegistry;
use torwaf_core::config::ProviderConfig;
use torwaf_core::traits::{
    IpSetPage, IpSetService, IpSetServiceFactory, IpSetSummary, IpSetUpdate, LockToken,
    ManagedIpSet, Scope,
};
use torwaf_core::{Error, Result};

const PROVIDER_NAME: &str = "wafv2";

/// Convert a torwaf scope to the SDK scope
pub fn waf_scope(scope: Scope) -> WafScope {
    match scope {
        Scope::Regional => WafScope::Regional,
        Scope::Cloudfront => WafScope::Cloudfront,
    }
}

/// AWS WAFv2 IP-set service
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, list and get calls go to AWS as usual but
/// `update_ip_set` only logs the payload it would have sent.
pub struct Wafv2IpSetService {
    /// WAFv2 API client
    client: aws_sdk_wafv2::Client,

    /// Region the client talks to (for logging)
    region: String,

    /// Dry-run mode: if true, skip UpdateIPSet
    dry_run: bool,
}

impl std::fmt::Debug for Wafv2IpSetService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wafv2IpSetService")
            .field("region", &self.region)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Wafv2IpSetService {
    /// Wrap an existing WAFv2 client
    pub fn new(client: aws_sdk_wafv2::Client, region: impl Into<String>, dry_run: bool) -> Self {
        Self {
            client,
            region: region.into(),
            dry_run,
        }
    }

    /// Build a client for `region` from the default AWS configuration chain
    pub async fn from_region(region: impl Into<String>, dry_run: bool) -> Self {
        let region = region.into();
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        Self::new(aws_sdk_wafv2::Client::new(&sdk_config), region, dry_run)
    }
}

#[async_trait]
impl IpSetService for Wafv2IpSetService {
    async fn list_ip_sets(&self, scope: Scope, next_marker: Option<&str>) -> Result<IpSetPage> {
        tracing::debug!(
            "ListIPSets scope={} region={} marker={:?}",
            scope,
            self.region,
            next_marker
        );

        let output = self
            .client
            .list_ip_sets()
            .scope(waf_scope(scope))
            .set_next_marker(next_marker.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                Error::service(
                    PROVIDER_NAME,
                    format!("ListIPSets failed: {}", DisplayErrorContext(&e)),
                )
            })?;

        // Summaries without a name or id can't be matched or fetched
        let ip_sets = output
            .ip_sets()
            .iter()
            .filter_map(|summary| {
                Some(IpSetSummary {
                    name: summary.name()?.to_string(),
                    id: summary.id()?.to_string(),
                })
            })
            .collect();

        Ok(IpSetPage {
            ip_sets,
            next_marker: output.next_marker().map(str::to_string),
        })
    }

    async fn get_ip_set(&self, name: &str, scope: Scope, id: &str) -> Result<ManagedIpSet> {
        tracing::debug!("GetIPSet name={} scope={} id={}", name, scope, id);

        let output = self
            .client
            .get_ip_set()
            .name(name)
            .scope(waf_scope(scope))
            .id(id)
            .send()
            .await
            .map_err(|e| {
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_waf_nonexistent_item_exception())
                {
                    Error::not_found(format!("IP set '{}' ({}) no longer exists", name, id))
                } else {
                    Error::service(
                        PROVIDER_NAME,
                        format!("GetIPSet failed: {}", DisplayErrorContext(&e)),
                    )
                }
            })?;

        let ip_set = output.ip_set().ok_or_else(|| {
            Error::service(PROVIDER_NAME, "GetIPSet response has no IP set")
        })?;
        let lock_token = output.lock_token().ok_or_else(|| {
            Error::service(PROVIDER_NAME, "GetIPSet response has no lock token")
        })?;

        Ok(ManagedIpSet {
            name: name.to_string(),
            scope,
            id: id.to_string(),
            addresses: ip_set.addresses().to_vec(),
            lock_token: LockToken::new(lock_token),
        })
    }

    async fn update_ip_set(&self, update: &IpSetUpdate) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would replace IP set {} ({}) with {} addresses",
                update.name,
                update.scope,
                update.addresses.len()
            );
            tracing::debug!("[DRY-RUN] Payload: {:?}", update.addresses);
            return Ok(());
        }

        tracing::debug!(
            "UpdateIPSet name={} scope={} id={} addresses={}",
            update.name,
            update.scope,
            update.id,
            update.addresses.len()
        );

        self.client
            .update_ip_set()
            .name(&update.name)
            .scope(waf_scope(update.scope))
            .id(&update.id)
            .lock_token(update.lock_token.as_str())
            .set_addresses(Some(update.addresses.clone()))
            .send()
            .await
            .map_err(|e| {
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_waf_optimistic_lock_exception())
                {
                    Error::concurrent_modification(format!(
                        "IP set '{}' was modified since it was read",
                        update.name
                    ))
                } else {
                    Error::update(format!(
                        "UpdateIPSet '{}' failed: {}",
                        update.name,
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Factory for creating WAFv2 services
pub struct Wafv2Factory;

#[async_trait]
impl IpSetServiceFactory for Wafv2Factory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn IpSetService>> {
        match config {
            ProviderConfig::Wafv2 { region, dry_run } => {
                if region.is_empty() {
                    return Err(Error::config("WAFv2 region cannot be empty"));
                }

                let service = Wafv2IpSetService::from_region(region.clone(), *dry_run).await;
                tracing::debug!("Created {:?}", service);
                Ok(Box::new(service))
            }
            _ => Err(Error::config("Invalid config for WAFv2 provider")),
        }
    }
}

/// Register the WAFv2 provider with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(Wafv2Factory));
}
