// # Notifier Trait
//
// Defines the interface for publishing a run report to an external channel.
//
// ## Implementations
//
// - AWS SNS: `torwaf-notify-sns` crate
//
// The reconciler only talks to a notifier when one is configured. A failed
// publish is logged and otherwise ignored; it never changes the outcome of
// the run being reported.

use async_trait::async_trait;

/// Trait for notification channel implementations
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish a subject/message pair
    async fn publish(&self, subject: &str, message: &str) -> Result<(), crate::Error>;

    /// Get the notifier name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}

/// Helper trait for constructing notifiers from configuration
#[async_trait]
pub trait NotifierFactory: Send + Sync {
    /// Create a Notifier instance from configuration
    async fn create(
        &self,
        config: &crate::config::NotifierConfig,
    ) -> Result<Box<dyn Notifier>, crate::Error>;
}
