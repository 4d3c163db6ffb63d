// # torwafd - Tor exit-node IP-set sync
//
// This binary is a THIN integration layer:
// - DO NOT add feed parsing, diffing or AWS logic here
// - All sync logic lives in torwaf-core and the adapter crates
// - Configuration is via environment variables ONLY
//
// torwafd is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering feeds, the IP-set provider and the notifier
// 4. Running one reconciliation and turning its outcome into an exit code
//
// It is meant to be started by a scheduler (cron, systemd timer,
// EventBridge-triggered task). Each invocation performs exactly one run.
//
// ## Configuration
//
// ### IP Set
// - `TORWAF_IPSET_NAME`: Name of the managed IP set (required)
// - `TORWAF_IPSET_SCOPE`: `CLOUDFRONT` (default) or `REGIONAL`
// - `TORWAF_REGION`: AWS region. Defaults to `us-east-1` for CLOUDFRONT;
//   REGIONAL falls back to `AWS_REGION`, then `us-east-1`
//
// ### Feeds
// - `TORWAF_BULK_LIST_URL`: Plain-text exit list URL
// - `TORWAF_RELAY_DIRECTORY_URL`: Relay details document URL
// - `TORWAF_HTTP_TIMEOUT_SECS`: Per-request timeout (default 30)
//
// ### Notifications
// - `TORWAF_SNS_TOPIC_ARN`: SNS topic for run reports (falls back to
//   `SNS_TOPIC_ARN`; unset disables notifications)
//
// ### Runtime
// - `TORWAF_MODE`: `live` (default) or `dry-run`
// - `TORWAF_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export TORWAF_IPSET_NAME=Tor-IPSet
// export TORWAF_IPSET_SCOPE=REGIONAL
// export TORWAF_REGION=eu-west-1
// export TORWAF_SNS_TOPIC_ARN=arn:aws:sns:eu-west-1:123456789012:tor-sync
//
// torwafd
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use torwaf_core::config::{DEFAULT_BULK_LIST_URL, DEFAULT_REGION, DEFAULT_RELAY_DIRECTORY_URL};
use torwaf_core::{
    ComponentRegistry, FeedConfig, NotifierConfig, ProviderConfig, Reconciler, Scope, SyncConfig,
};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the possible outcomes of one invocation
///
/// - 0: The IP set is in sync (updated or already current)
/// - 1: Configuration or startup error, nothing was attempted
/// - 2: The run failed (feed, lookup or write)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TorwafExitCode {
    /// Run succeeded
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Run failed
    RunFailed = 2,
}

impl From<TorwafExitCode> for ExitCode {
    fn from(code: TorwafExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    ip_set_name: String,
    scope: String,
    region: String,
    sns_topic_arn: Option<String>,
    bulk_list_url: String,
    relay_directory_url: String,
    http_timeout_secs: u64,
    mode: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup function
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let Some(ip_set_name) = var("TORWAF_IPSET_NAME") else {
            anyhow::bail!(
                "TORWAF_IPSET_NAME is required. \
                Set it via: export TORWAF_IPSET_NAME=Tor-IPSet"
            );
        };

        let http_timeout_secs: u64 = match var("TORWAF_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("TORWAF_HTTP_TIMEOUT_SECS must be a number. Got: {}", raw)
            })?,
            None => 30,
        };

        let scope = var("TORWAF_IPSET_SCOPE").unwrap_or_else(|| "CLOUDFRONT".to_string());

        // CloudFront IP sets only live in us-east-1, whatever region the host runs in
        let region = match var("TORWAF_REGION") {
            Some(region) => region,
            None if scope.trim().eq_ignore_ascii_case("CLOUDFRONT") => DEFAULT_REGION.to_string(),
            None => var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
        };

        Ok(Self {
            ip_set_name: ip_set_name.trim().to_string(),
            scope,
            region,
            sns_topic_arn: var("TORWAF_SNS_TOPIC_ARN").or_else(|| var("SNS_TOPIC_ARN")),
            bulk_list_url: var("TORWAF_BULK_LIST_URL")
                .unwrap_or_else(|| DEFAULT_BULK_LIST_URL.to_string()),
            relay_directory_url: var("TORWAF_RELAY_DIRECTORY_URL")
                .unwrap_or_else(|| DEFAULT_RELAY_DIRECTORY_URL.to_string()),
            http_timeout_secs,
            mode: var("TORWAF_MODE").unwrap_or_else(|| "live".to_string()),
            log_level: var("TORWAF_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the settings that only the binary understands
    fn validate(&self) -> Result<()> {
        match self.mode.to_lowercase().as_str() {
            "live" | "dry-run" | "dry_run" => {}
            _ => anyhow::bail!(
                "TORWAF_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "TORWAF_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        if self.bulk_list_url.starts_with("http://")
            || self.relay_directory_url.starts_with("http://")
        {
            eprintln!(
                "WARNING: a feed URL uses HTTP (not HTTPS). \
                Feed contents could be altered in transit."
            );
        }

        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        self.mode.to_lowercase() != "live"
    }

    /// Build and validate the library configuration
    fn to_sync_config(&self) -> Result<SyncConfig> {
        let scope: Scope = self.scope.parse()?;

        let sync = SyncConfig {
            provider: ProviderConfig::Wafv2 {
                region: self.region.clone(),
                dry_run: self.is_dry_run(),
            },
            notifier: match &self.sns_topic_arn {
                Some(topic_arn) => NotifierConfig::Sns {
                    topic_arn: topic_arn.clone(),
                    region: None,
                },
                None => NotifierConfig::Disabled,
            },
            feeds: vec![
                FeedConfig::BulkList {
                    url: self.bulk_list_url.clone(),
                    timeout_secs: self.http_timeout_secs,
                },
                FeedConfig::RelayDirectory {
                    url: self.relay_directory_url.clone(),
                    timeout_secs: self.http_timeout_secs,
                },
            ],
            ..SyncConfig::new(self.ip_set_name.clone(), scope)
        };

        sync.validate()?;
        Ok(sync)
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return TorwafExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return TorwafExitCode::ConfigError.into();
    }

    let sync_config = match config.to_sync_config() {
        Ok(sync) => sync,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return TorwafExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return TorwafExitCode::ConfigError.into();
    }

    info!("Starting torwafd {}", env!("CARGO_PKG_VERSION"));
    if config.is_dry_run() {
        warn!("Dry-run mode: the IP set will not be modified");
    }

    // One run, one thread: feeds and service calls happen strictly in order
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return TorwafExitCode::ConfigError.into();
        }
    };

    rt.block_on(run_once(sync_config)).into()
}

/// Register every built-in component
fn register_components(registry: &ComponentRegistry) {
    torwaf_feed_http::register(registry);

    #[cfg(feature = "wafv2")]
    {
        info!("Registering WAFv2 provider");
        torwaf_provider_wafv2::register(registry);
    }

    #[cfg(feature = "sns")]
    {
        info!("Registering SNS notifier");
        torwaf_notify_sns::register(registry);
    }
}

/// Create the reconciler from configuration
async fn build_reconciler(registry: &ComponentRegistry, config: SyncConfig) -> Result<Reconciler> {
    let feeds = registry.create_feeds(&config.feeds)?;
    let service = registry.create_ip_set_service(&config.provider).await?;
    let notifier = registry.create_notifier(&config.notifier).await?;

    if notifier.is_none() {
        info!("Notifications disabled");
    }

    Ok(Reconciler::new(feeds, service, notifier, config)?)
}

/// Run one reconciliation
async fn run_once(config: SyncConfig) -> TorwafExitCode {
    let registry = ComponentRegistry::new();
    register_components(&registry);

    let reconciler = match build_reconciler(&registry, config).await {
        Ok(reconciler) => reconciler,
        Err(e) => {
            error!("Startup error: {}", e);
            return TorwafExitCode::ConfigError;
        }
    };

    match reconciler.run().await {
        Ok(_) => TorwafExitCode::Success,
        Err(e) => {
            error!("Sync failed ({}): {}", e.kind(), e);
            TorwafExitCode::RunFailed
        }
    }
}
