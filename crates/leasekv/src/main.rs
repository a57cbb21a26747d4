// # leasekv - dnsmasq lease hook
//
// dnsmasq runs this binary once per lease event (`--dhcp-script`). Each run
// mirrors exactly one event into the key-value store and exits.
//
// This binary is a THIN integration layer:
// - event semantics live in leasekv-core
// - backends live in leasekv-core (file, memory) and leasekv-consul
// - configuration is via environment variables ONLY
//
// ## Invocation
//
// ```text
// leasekv -v                      (also --v, -version, --version)
// leasekv init
// leasekv old 28:6c:07:85:ed:ea 192.168.1.222 xiaomi_gateway
// leasekv del 28:6c:07:85:ed:ea 192.168.1.222 xiaomi_gateway
// ```
//
// `init` prints one `expire mac ip hostname client_id` line per stored
// lease on stdout. Logs go to stderr so they never mix with the dump.
//
// A version request prints `<argv0>: <crate version>` and exits before
// any configuration is read.
//
// ## Configuration
//
// ### Store
// - `LEASEKV_STORE`: Backend (consul, file, memory); default consul
// - `LEASEKV_STORE_PATH`: Path to the JSON store (for file)
// - `LEASEKV_TIMEOUT_SECS`: HTTP timeout towards Consul; default 10
//
// ### Consul
// - `CONSUL_HTTP_ADDR`: Agent address; default 127.0.0.1:8500
// - `CONSUL_HTTP_TOKEN`: ACL token
// - `CONSUL_HTTP_SSL`: Use https when the address has no scheme
// - `CONSUL_DATACENTER`: Datacenter to address
//
// ### Logging
// - `LEASEKV_LOG_LEVEL`: trace, debug, info, warn, error; default warn
//
// ## Example
//
// ```text
// # /etc/dnsmasq.conf
// dhcp-script=/usr/local/bin/leasekv
// leasefile-ro
// ```

use anyhow::{Context, Result};
use leasekv_core::config::{ConsulConfig, DEFAULT_CONSUL_ADDRESS, DEFAULT_TIMEOUT_SECS, StoreConfig};
use leasekv_core::{
    Dispatcher, Disposition, FileKvStore, HookEnv, HookEvent, Invocation, KvStore, LeaseStore,
    MemoryKvStore,
};
use std::env;
use std::io::Write;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes reported back to dnsmasq
///
/// dnsmasq logs a non-zero status and carries on.
#[derive(Debug, Clone, Copy)]
enum LeasekvExitCode {
    /// Event handled (or deliberately ignored)
    Success = 0,
    /// Configuration or startup error
    ConfigError = 1,
    /// Store or codec failure while handling the event
    RuntimeError = 2,
}

impl From<LeasekvExitCode> for ExitCode {
    fn from(code: LeasekvExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    store: StoreConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let store_type = var("LEASEKV_STORE").unwrap_or_else(|| "consul".to_string());
        let store = match store_type.to_lowercase().as_str() {
            "consul" => {
                let timeout_secs = match var("LEASEKV_TIMEOUT_SECS") {
                    Some(raw) => raw.trim().parse::<u64>().with_context(|| {
                        format!("LEASEKV_TIMEOUT_SECS must be a number of seconds. Got: {}", raw)
                    })?,
                    None => DEFAULT_TIMEOUT_SECS,
                };

                StoreConfig::Consul(ConsulConfig {
                    address: var("CONSUL_HTTP_ADDR")
                        .unwrap_or_else(|| DEFAULT_CONSUL_ADDRESS.to_string()),
                    use_tls: var("CONSUL_HTTP_SSL").is_some_and(|v| {
                        matches!(v.trim().to_lowercase().as_str(), "true" | "1")
                    }),
                    token: var("CONSUL_HTTP_TOKEN"),
                    datacenter: var("CONSUL_DATACENTER"),
                    timeout_secs,
                })
            }
            "file" => StoreConfig::File {
                path: var("LEASEKV_STORE_PATH").with_context(|| {
                    "LEASEKV_STORE_PATH is required when LEASEKV_STORE=file. \
                    Set it via: export LEASEKV_STORE_PATH=/var/lib/leasekv/leases.json"
                })?,
            },
            "memory" => StoreConfig::Memory,
            other => anyhow::bail!(
                "LEASEKV_STORE '{}' is not supported. \
                Supported stores: consul, file, memory",
                other
            ),
        };

        Ok(Self {
            store,
            log_level: var("LEASEKV_LOG_LEVEL").unwrap_or_else(|| "warn".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.store.validate()?;

        #[cfg(not(feature = "consul"))]
        {
            if matches!(self.store, StoreConfig::Consul(_)) {
                anyhow::bail!(
                    "LEASEKV_STORE=consul requires the `consul` feature. \
                    Rebuild with it or use LEASEKV_STORE=file"
                );
            }
        }

        self.level()?;
        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "LEASEKV_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let event = match Invocation::from_args(&args) {
        Invocation::Version => {
            let program = args.first().map(String::as_str).unwrap_or("leasekv");
            println!("{}: {}", program, env!("CARGO_PKG_VERSION"));
            return LeasekvExitCode::Success.into();
        }
        Invocation::Event(event) => event,
    };

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return LeasekvExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return LeasekvExitCode::ConfigError.into();
    }

    let log_level = config.level().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return LeasekvExitCode::ConfigError.into();
    }

    // One event per process; nothing to spread across threads
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return LeasekvExitCode::ConfigError.into();
        }
    };

    let kv = match rt.block_on(build_store(&config.store)) {
        Ok(kv) => kv,
        Err(e) => {
            error!("Failed to open {} store: {:#}", config.store.type_name(), e);
            eprintln!("leasekv: failed to open store: {:#}", e);
            return LeasekvExitCode::ConfigError.into();
        }
    };

    match rt.block_on(run(LeaseStore::new(kv), event)) {
        Ok(disposition) => {
            info!("Event handled: {:?}", disposition);
            LeasekvExitCode::Success.into()
        }
        Err(e) => {
            error!("Event failed: {:#}", e);
            eprintln!("leasekv: {:#}", e);
            LeasekvExitCode::RuntimeError.into()
        }
    }
}

/// Construct the configured backend; a fresh one per invocation
async fn build_store(config: &StoreConfig) -> Result<Box<dyn KvStore>> {
    match config {
        StoreConfig::File { path } => {
            let store = FileKvStore::open(path)
                .await
                .with_context(|| format!("opening {}", path))?;
            info!("Using file store at {}", store.path().display());
            Ok(Box::new(store))
        }
        StoreConfig::Memory => {
            warn!("Memory store selected: leases are lost when this process exits");
            Ok(Box::new(MemoryKvStore::new()))
        }
        #[cfg(feature = "consul")]
        StoreConfig::Consul(consul) => Ok(Box::new(leasekv_consul::ConsulKvStore::new(consul)?)),
        #[cfg(not(feature = "consul"))]
        StoreConfig::Consul(_) => {
            anyhow::bail!("Consul backend not compiled in (enable the `consul` feature)")
        }
    }
}

/// Handle one hook event against `store`
async fn run(store: LeaseStore, event: HookEvent) -> Result<Disposition> {
    let env = HookEnv::from_env();
    let dispatcher = Dispatcher::new(store);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let disposition = dispatcher
        .dispatch(&event, &env, &mut out)
        .await
        .with_context(|| format!("{} event", event.kind))?;
    out.flush().context("flushing stdout")?;

    Ok(disposition)
}
