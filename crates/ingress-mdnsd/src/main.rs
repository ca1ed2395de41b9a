// # ingress-mdnsd - Ingress mDNS Daemon
//
// Announces the `.local` hostnames of cluster Ingresses on the local network
// segment so that LAN clients resolve them without a DNS server.
//
// The daemon is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Looking up the interface and building the cluster client
// 4. Running the reconcile engine until SIGINT/SIGTERM
//
// All reconciliation logic lives in ingress-mdns-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `INGRESS_MDNS_INTERFACE`: Interface to advertise on (default: eth0)
// - `INGRESS_MDNS_USE_KUBECONFIG`: `true` to use a kubeconfig file instead of
//   the in-cluster service account (default: false)
// - `KUBECONFIG`: Kubeconfig path (default: $HOME/.kube/config)
// - `INGRESS_MDNS_LOCAL_SUFFIX`: Suffix of hostnames to advertise (default: .local)
// - `INGRESS_MDNS_LABEL_SELECTOR`: Only watch Ingresses matching this selector
// - `INGRESS_MDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export INGRESS_MDNS_INTERFACE=enp3s0
// export INGRESS_MDNS_USE_KUBECONFIG=true
//
// ingress-mdnsd
// ```

use anyhow::{Context, Result};
use ingress_mdns_core::{MdnsConfig, ReconcileEngine};
use ingress_mdns_kube::KubeIngressSource;
use ingress_mdns_zeroconf::{MdnsSdAdvertiser, find_interface};
use kube::Client;
use kube::config::{KubeConfigOptions, Kubeconfig};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum MdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<MdnsExitCode> for ExitCode {
    fn from(code: MdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    interface: String,
    use_kubeconfig: bool,
    kubeconfig_path: Option<PathBuf>,
    local_suffix: String,
    label_selector: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let use_kubeconfig = match lookup("INGRESS_MDNS_USE_KUBECONFIG") {
            None => false,
            Some(value) => parse_bool(&value).with_context(|| {
                format!("INGRESS_MDNS_USE_KUBECONFIG must be true or false. Got: {}", value)
            })?,
        };

        let kubeconfig_path = lookup("KUBECONFIG")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                lookup("HOME")
                    .or_else(|| lookup("USERPROFILE"))
                    .map(|home| PathBuf::from(home).join(".kube").join("config"))
            });

        Ok(Self {
            interface: lookup("INGRESS_MDNS_INTERFACE").unwrap_or_else(|| "eth0".to_string()),
            use_kubeconfig,
            kubeconfig_path,
            local_suffix: lookup("INGRESS_MDNS_LOCAL_SUFFIX")
                .unwrap_or_else(|| ".local".to_string()),
            label_selector: lookup("INGRESS_MDNS_LABEL_SELECTOR").filter(|s| !s.is_empty()),
            log_level: lookup("INGRESS_MDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.interface.is_empty() {
            anyhow::bail!(
                "INGRESS_MDNS_INTERFACE cannot be empty. \
                Set it via: export INGRESS_MDNS_INTERFACE=eth0"
            );
        }

        if self.use_kubeconfig && self.kubeconfig_path.is_none() {
            anyhow::bail!(
                "INGRESS_MDNS_USE_KUBECONFIG=true but no kubeconfig path could be determined. \
                Set KUBECONFIG or HOME."
            );
        }

        self.mdns_config().validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "INGRESS_MDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn mdns_config(&self) -> MdnsConfig {
        let mut config = MdnsConfig::new(self.interface.clone());
        config.advertise = config.advertise.with_local_suffix(self.local_suffix.clone());
        config
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => anyhow::bail!("not a boolean: {}", value),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return MdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return MdnsExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return MdnsExitCode::ConfigError.into();
    }

    info!("Starting ingress-mdnsd on interface {}", config.interface);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return MdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        // Nothing has been announced until the engine runs
        let mut engine = match build_engine(&config).await {
            Ok(engine) => engine,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return MdnsExitCode::ConfigError;
            }
        };

        if let Err(e) = engine.run().await {
            error!("Daemon error: {}", e);
            MdnsExitCode::RuntimeError
        } else {
            info!("Shut down cleanly");
            MdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Wire the engine from configuration
async fn build_engine(config: &Config) -> Result<ReconcileEngine> {
    let interface = find_interface(&config.interface)?;
    info!(
        "Using interface {} ({} address(es))",
        interface.name,
        interface.addresses.len()
    );

    let client = kube_client(config).await?;

    let mut source = KubeIngressSource::new(client);
    if let Some(selector) = &config.label_selector {
        info!("Watching Ingresses matching {}", selector);
        source = source.with_label_selector(selector);
    }

    let advertiser = MdnsSdAdvertiser::new(interface.name)?;

    let (engine, _events) = ReconcileEngine::new(
        Box::new(source),
        Box::new(advertiser),
        config.mdns_config(),
    )?;

    Ok(engine)
}

/// Build a cluster client from the service account or a kubeconfig file
async fn kube_client(config: &Config) -> Result<Client> {
    let kube_config = match (&config.kubeconfig_path, config.use_kubeconfig) {
        (Some(path), true) => {
            info!("Loading kubeconfig from {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Invalid kubeconfig")?
        }
        _ => {
            info!("Using in-cluster configuration");
            kube::Config::incluster().context("Failed to load in-cluster configuration")?
        }
    };

    Client::try_from(kube_config).context("Failed to create Kubernetes client")
}
