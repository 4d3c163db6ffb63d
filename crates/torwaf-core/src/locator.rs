//! IP-set lookup by name
//!
//! The service only lets us fetch an IP set by id, so the locator walks the
//! paginated list for the scope until it sees the configured name, then
//! reads that IP set together with a fresh lock token.

use crate::error::{Error, Result};
use crate::traits::{IpSetService, ManagedIpSet, Scope};
use tracing::debug;

/// Finds the managed IP set in the remote service
pub struct IpSetLocator<'a> {
    service: &'a dyn IpSetService,
}

impl<'a> IpSetLocator<'a> {
    /// Create a locator backed by `service`
    pub fn new(service: &'a dyn IpSetService) -> Self {
        Self { service }
    }

    /// Locate an IP set by name within a scope
    ///
    /// Pages are followed until the name is found or the service returns
    /// no continuation marker. There is no page limit.
    ///
    /// # Returns
    ///
    /// - `Ok(ManagedIpSet)`: The IP set and its current lock token
    /// - `Err(Error::NotFound)`: No IP set with that name in any page
    pub async fn locate(&self, name: &str, scope: Scope) -> Result<ManagedIpSet> {
        let mut next_marker: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .service
                .list_ip_sets(scope, next_marker.as_deref())
                .await?;
            pages += 1;

            debug!(
                "Listed page {} of {} IP sets in scope {}",
                pages,
                page.ip_sets.len(),
                scope
            );

            if let Some(summary) = page.ip_sets.iter().find(|s| s.name == name) {
                debug!("Found IP set {} (id: {}) on page {}", name, summary.id, pages);
                return self.service.get_ip_set(name, scope, &summary.id).await;
            }

            match page.next_marker {
                Some(marker) if !marker.is_empty() => next_marker = Some(marker),
                _ => break,
            }
        }

        Err(Error::not_found(format!(
            "IP set '{}' not found in scope {} ({} page(s) searched)",
            name, scope, pages
        )))
    }
}
