// # AWS SNS Notifier
//
// Publishes torwaf run reports to an SNS topic.
//
// ## Behavior
//
// - One Publish call per run
// - Subjects are built by `Notification` and are already plain ASCII under
//   the SNS 100-character limit
// - A failed publish is returned as `Error::Notify`; the reconciler logs it
//   and carries on
//
// ## Region
//
// The client region is taken from the configuration when given, otherwise
// from the topic ARN (`arn:<partition>:sns:<region>:<account>:<topic>`).

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sns::error::DisplayErrorContext;
use torwaf_core::ComponentRegistry;
use torwaf_core::config::NotifierConfig;
use torwaf_core::traits::{Notifier, NotifierFactory};
use torwaf_core::{Error, Result};

const NOTIFIER_NAME: &str = "sns";

/// Extract the region from an SNS topic ARN
pub fn region_from_arn(topic_arn: &str) -> Option<&str> {
    let mut parts = topic_arn.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("arn"), Some(_), Some("sns"), Some(region)) if !region.is_empty() => Some(region),
        _ => None,
    }
}

/// SNS topic notifier
pub struct SnsNotifier {
    /// SNS API client
    client: aws_sdk_sns::Client,

    /// Topic to publish to
    topic_arn: String,
}

impl std::fmt::Debug for SnsNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnsNotifier")
            .field("topic_arn", &self.topic_arn)
            .finish()
    }
}

impl SnsNotifier {
    /// Wrap an existing SNS client
    pub fn new(client: aws_sdk_sns::Client, topic_arn: impl Into<String>) -> Self {
        Self {
            client,
            topic_arn: topic_arn.into(),
        }
    }

    /// Topic this notifier publishes to
    pub fn topic_arn(&self) -> &str {
        &self.topic_arn
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<()> {
        tracing::debug!("Publishing '{}' to {}", subject, self.topic_arn);

        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .map_err(|e| {
                Error::notify(format!(
                    "Publish to {} failed: {}",
                    self.topic_arn,
                    DisplayErrorContext(&e)
                ))
            })?;

        tracing::debug!("Published message id {:?}", output.message_id());
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        NOTIFIER_NAME
    }
}

/// Factory for creating SNS notifiers
pub struct SnsFactory;

#[async_trait]
impl NotifierFactory for SnsFactory {
    async fn create(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        let NotifierConfig::Sns { topic_arn, region } = config else {
            return Err(Error::config("Invalid config for SNS notifier"));
        };

        let region = match region.as_deref() {
            Some(region) => region.to_string(),
            None => region_from_arn(topic_arn)
                .ok_or_else(|| {
                    Error::config(format!(
                        "Cannot determine region from SNS topic ARN '{}'",
                        topic_arn
                    ))
                })?
                .to_string(),
        };

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;

        Ok(Box::new(SnsNotifier::new(
            aws_sdk_sns::Client::new(&sdk_config),
            topic_arn.clone(),
        )))
    }
}

/// Register the SNS notifier with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_notifier(NOTIFIER_NAME, Box::new(SnsFactory));
}
